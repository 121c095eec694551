//! Segment transfer error type for retry classification.

use thiserror::Error;

/// Error returned by a single segment transfer attempt.
/// Kept separate from `FetchOutcome` so attempts can be classified and retried.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, truncated body, etc.).
    #[error("{0}")]
    Curl(#[source] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Disk/storage write failed (e.g. disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// The job's cancel token fired before or during the transfer.
    #[error("cancelled")]
    Cancelled,
}
