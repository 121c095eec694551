//! Bounded retries for segment GETs.
//!
//! A failed attempt is mapped to an [`ErrorKind`]; the [`RetryPolicy`] turns the
//! kind and attempt number into "give up" or "sleep, then try again".

mod classify;
mod error;
mod policy;
mod run;

pub use error::SegmentError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
