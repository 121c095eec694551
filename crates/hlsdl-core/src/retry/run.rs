//! Retry loop: run a closure until success or policy says stop.

use super::error::SegmentError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;
use std::time::{Duration, Instant};

/// Longest stretch the backoff sleeps without looking at the cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Sleep for `d`, waking early when `cancel` fires. Returns false if cancelled.
fn backoff_sleep(d: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + d;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again;
/// cancellation during the sleep ends the loop with `SegmentError::Cancelled`.
/// The closure receives the 1-based attempt number.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut f: F,
) -> Result<T, SegmentError>
where
    F: FnMut(u32) -> Result<T, SegmentError>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled);
        }
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = e.kind();
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, delay_ms = d.as_millis() as u64, error = %e, "retrying");
                        if !backoff_sleep(d, cancel) {
                            return Err(SegmentError::Cancelled);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn retries_until_success() {
        let mut calls = 0;
        let res = run_with_retry(&fast_policy(5), &CancelToken::new(), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(SegmentError::Http(503))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(res.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn stops_at_max_attempts() {
        let mut calls = 0;
        let res: Result<(), _> = run_with_retry(&fast_policy(2), &CancelToken::new(), |_| {
            calls += 1;
            Err(SegmentError::Http(500))
        });
        assert!(matches!(res, Err(SegmentError::Http(500))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn does_not_retry_client_errors() {
        let mut calls = 0;
        let res: Result<(), _> = run_with_retry(&fast_policy(5), &CancelToken::new(), |_| {
            calls += 1;
            Err(SegmentError::Http(404))
        });
        assert!(matches!(res, Err(SegmentError::Http(404))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn cancelled_token_skips_attempts() {
        let token = CancelToken::new();
        token.cancel();
        let mut calls = 0;
        let res: Result<(), _> = run_with_retry(&fast_policy(5), &token, |_| {
            calls += 1;
            Ok(())
        });
        assert!(matches!(res, Err(SegmentError::Cancelled)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn cancel_during_backoff_returns_promptly() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
        };
        let token = CancelToken::new();
        let trip = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trip.cancel();
        });
        let mut calls = 0;
        let started = Instant::now();
        let res: Result<(), _> = run_with_retry(&policy, &token, |_| {
            calls += 1;
            Err(SegmentError::Http(503))
        });
        canceller.join().unwrap();
        assert!(matches!(res, Err(SegmentError::Cancelled)));
        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
