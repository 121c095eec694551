//! Single-segment download: resume check, probe, streamed GET into a `.part`
//! file, retry with backoff, atomic rename on success.

use std::fmt;

use crate::control::CancelToken;
use crate::http::{self, HttpOptions};
use crate::probe;
use crate::retry::{run_with_retry, RetryPolicy, SegmentError};
use crate::segment::Segment;
use crate::storage::{self, PartFile};

/// What happened to one segment. Every segment of a job gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Downloaded `bytes` and moved into place.
    Success { bytes: u64 },
    /// A non-empty file was already at the segment's path; no request was made.
    SkippedAlreadyPresent,
    /// The HEAD probe failed; no file was created.
    Unreachable,
    /// The GET failed after all retry attempts; any partial file was removed.
    TransferError { reason: String },
    /// Not attempted, or aborted mid-transfer, because the job was cancelled.
    Cancelled,
}

impl FetchOutcome {
    /// True when the segment file is on disk after this outcome.
    pub fn is_available(&self) -> bool {
        matches!(
            self,
            FetchOutcome::Success { .. } | FetchOutcome::SkippedAlreadyPresent
        )
    }

    pub fn is_failure(&self) -> bool {
        !self.is_available()
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success { bytes } => write!(f, "downloaded {} bytes", bytes),
            FetchOutcome::SkippedAlreadyPresent => write!(f, "already present"),
            FetchOutcome::Unreachable => write!(f, "unreachable"),
            FetchOutcome::TransferError { reason } => write!(f, "transfer failed: {}", reason),
            FetchOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Downloads one segment to its local path. Implementations must be safe to
/// call from several worker threads at once.
pub trait Fetch: Send + Sync {
    fn fetch(&self, segment: &Segment, cancel: &CancelToken) -> FetchOutcome;
}

/// curl-backed segment fetcher.
#[derive(Debug, Clone, Default)]
pub struct SegmentFetcher {
    opts: HttpOptions,
    retry: RetryPolicy,
}

impl SegmentFetcher {
    pub fn new(opts: HttpOptions, retry: RetryPolicy) -> Self {
        Self { opts, retry }
    }

    /// One GET attempt. On any error the `.part` file is dropped (and thereby removed).
    fn download_once(&self, segment: &Segment, cancel: &CancelToken) -> Result<u64, SegmentError> {
        let mut part = PartFile::create(&segment.local_path, self.opts.buffer_size)
            .map_err(SegmentError::Storage)?;
        let mut easy = http::body_request(&segment.uri, &self.opts).map_err(SegmentError::Curl)?;
        easy.progress(true).map_err(SegmentError::Curl)?;

        let mut storage_error: Option<std::io::Error> = None;
        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match part.write_chunk(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        storage_error = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(SegmentError::Curl)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(SegmentError::Curl)?;
            transfer.perform()
        };
        if let Err(e) = perform_result {
            if e.is_aborted_by_callback() {
                return Err(SegmentError::Cancelled);
            }
            if e.is_write_error() {
                if let Some(io_err) = storage_error.take() {
                    return Err(SegmentError::Storage(io_err));
                }
            }
            return Err(SegmentError::Curl(e));
        }

        let code = easy.response_code().map_err(SegmentError::Curl)?;
        if !http::is_success(code) {
            tracing::debug!(
                index = segment.index,
                code,
                bytes = part.bytes_written(),
                "discarding error response body"
            );
            part.discard();
            return Err(SegmentError::Http(code));
        }
        part.finalize().map_err(SegmentError::Storage)
    }
}

impl Fetch for SegmentFetcher {
    fn fetch(&self, segment: &Segment, cancel: &CancelToken) -> FetchOutcome {
        let index = segment.index;
        if storage::is_present(&segment.local_path) {
            tracing::debug!(index, path = %segment.local_path.display(), "segment already present, skipping");
            return FetchOutcome::SkippedAlreadyPresent;
        }
        if cancel.is_cancelled() {
            return FetchOutcome::Cancelled;
        }
        if !probe::probe(&segment.uri, &self.opts) {
            tracing::warn!(index, uri = %segment.uri, "segment URL not reachable");
            return FetchOutcome::Unreachable;
        }

        let result = run_with_retry(&self.retry, cancel, |attempt| {
            if attempt > 1 {
                tracing::debug!(index, attempt, "retrying segment");
            }
            self.download_once(segment, cancel)
        });
        match result {
            Ok(bytes) => {
                tracing::debug!(index, bytes, path = %segment.local_path.display(), "downloaded segment");
                FetchOutcome::Success { bytes }
            }
            Err(SegmentError::Cancelled) => FetchOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(index, uri = %segment.uri, error = %e, "segment download failed");
                FetchOutcome::TransferError {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn segment_at(path: PathBuf) -> Segment {
        Segment {
            index: 0,
            // Nothing listens on port 9 locally; any network call would fail fast.
            uri: "http://127.0.0.1:9/index0.ts".to_string(),
            local_path: path,
        }
    }

    #[test]
    fn present_file_is_skipped_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index0.ts");
        std::fs::write(&path, b"existing").unwrap();
        let outcome = SegmentFetcher::default().fetch(&segment_at(path.clone()), &CancelToken::new());
        assert_eq!(outcome, FetchOutcome::SkippedAlreadyPresent);
        assert_eq!(std::fs::read(&path).unwrap(), b"existing");
    }

    #[test]
    fn cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let outcome = SegmentFetcher::default().fetch(&segment_at(dir.path().join("index0.ts")), &token);
        assert_eq!(outcome, FetchOutcome::Cancelled);
    }

    #[test]
    fn unreachable_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index0.ts");
        let outcome = SegmentFetcher::default().fetch(&segment_at(path.clone()), &CancelToken::new());
        assert_eq!(outcome, FetchOutcome::Unreachable);
        assert!(!path.exists());
        assert!(!storage::temp_path(&path).exists());
    }

    #[test]
    fn outcome_classification() {
        assert!(FetchOutcome::Success { bytes: 1 }.is_available());
        assert!(FetchOutcome::SkippedAlreadyPresent.is_available());
        assert!(FetchOutcome::Unreachable.is_failure());
        assert!(FetchOutcome::Cancelled.is_failure());
        assert_eq!(
            FetchOutcome::TransferError { reason: "HTTP 500".into() }.to_string(),
            "transfer failed: HTTP 500"
        );
    }
}
