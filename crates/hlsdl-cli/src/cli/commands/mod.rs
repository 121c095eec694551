//! CLI command handlers, one file per subcommand.

mod fetch;
mod merge;
mod remux;

pub use fetch::{run_fetch, FetchArgs};
pub use merge::run_merge;
pub use remux::run_remux;
