//! Bounded-concurrency fetch of every segment of one playlist job.
//!
//! A shared work queue is drained by `min(max_concurrency, segments)` worker
//! threads. Each finished segment reports `(index, outcome)` over a channel;
//! one segment failing never stops the others. The report is keyed by segment
//! index, independent of completion order.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::control::CancelToken;
use crate::fetcher::{Fetch, FetchOutcome};
use crate::segment::{PlaylistJob, Segment};

/// Per-segment outcomes of one job, indexed by segment index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn outcome(&self, index: usize) -> Option<&FetchOutcome> {
        self.outcomes.get(index)
    }

    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Segments that ended without a file on disk, in index order.
    pub fn failures(&self) -> Vec<(usize, &FetchOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_failure())
            .collect()
    }

    pub fn downloaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FetchOutcome::Success { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FetchOutcome::SkippedAlreadyPresent))
            .count()
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                FetchOutcome::Success { bytes } => *bytes,
                _ => 0,
            })
            .sum()
    }

    /// True when every segment is on disk.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(FetchOutcome::is_available)
    }
}

/// Fetch all segments of `job` with at most `job.max_concurrency()` in flight.
/// Blocks until every segment has an outcome. Call from `spawn_blocking` in async code.
pub fn run_fetch(job: &PlaylistJob, fetcher: Arc<dyn Fetch>, cancel: &CancelToken) -> FetchReport {
    let segments = job.segments();
    let count = segments.len();
    let mut slots: Vec<Option<FetchOutcome>> = vec![None; count];
    if count == 0 {
        return FetchReport { outcomes: Vec::new() };
    }

    let work: Arc<Mutex<VecDeque<Segment>>> =
        Arc::new(Mutex::new(segments.iter().cloned().collect()));
    let (tx, rx) = mpsc::channel::<(usize, FetchOutcome)>();
    let num_workers = job.max_concurrency().min(count);
    tracing::info!(
        url = %job.source_url(),
        segments = count,
        workers = num_workers,
        "fetching segments"
    );

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let fetcher = Arc::clone(&fetcher);
        let cancel = cancel.clone();
        handles.push(std::thread::spawn(move || loop {
            if cancel.is_cancelled() {
                break;
            }
            let next = match work.lock() {
                Ok(mut q) => q.pop_front(),
                Err(_) => None,
            };
            let Some(segment) = next else {
                break;
            };
            // A panic is confined to its segment; the worker keeps draining the queue.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch(&segment, &cancel)))
                .unwrap_or_else(|_| {
                    tracing::error!(index = segment.index, "segment fetch panicked");
                    FetchOutcome::TransferError {
                        reason: "fetch panicked".to_string(),
                    }
                });
            if tx.send((segment.index, outcome)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    // Ends when every worker has exited and dropped its sender.
    for (index, outcome) in rx {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    let mut panicked = false;
    for h in handles {
        if h.join().is_err() {
            panicked = true;
        }
    }
    if panicked {
        tracing::error!("segment worker panicked");
    }

    let outcomes = slots
        .into_iter()
        .map(|slot| match slot {
            Some(o) => o,
            None if cancel.is_cancelled() => FetchOutcome::Cancelled,
            None => FetchOutcome::TransferError {
                reason: "worker panicked".to_string(),
            },
        })
        .collect();
    FetchReport { outcomes }
}
