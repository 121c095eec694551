//! Run many playlist jobs with a bounded number in flight.
//!
//! Keeps up to `max_batch_concurrency` jobs running at once; when one
//! finishes, the next request is started until none are left. Each job runs
//! its blocking pipeline on tokio's blocking pool, so the effective transfer
//! cap is `per-job concurrency * max_batch_concurrency`.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::control::{CancelToken, JobCancelled};
use crate::pipeline::{JobError, JobReport, JobRequest, Pipeline};

/// One result per request, in request order.
#[derive(Debug)]
pub struct BatchReport {
    results: Vec<Result<JobReport, JobError>>,
}

impl BatchReport {
    pub fn results(&self) -> &[Result<JobReport, JobError>] {
        &self.results
    }

    pub fn into_results(self) -> Vec<Result<JobReport, JobError>> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Jobs that errored or finished with missing segments or a failed assembly.
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !matches!(r, Ok(report) if report.is_success()))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

pub async fn run_all(
    pipeline: Arc<Pipeline>,
    requests: Vec<JobRequest>,
    max_batch_concurrency: usize,
    cancel: CancelToken,
) -> BatchReport {
    let max_concurrent = max_batch_concurrency.max(1);
    tracing::info!(
        jobs = requests.len(),
        max_concurrent,
        transfer_cap = pipeline.max_concurrency().saturating_mul(max_concurrent),
        "starting batch"
    );

    let mut slots: Vec<Option<Result<JobReport, JobError>>> =
        (0..requests.len()).map(|_| None).collect();
    let mut queue = requests.into_iter().enumerate();
    let mut join_set = JoinSet::new();

    loop {
        while join_set.len() < max_concurrent && !cancel.is_cancelled() {
            let Some((index, req)) = queue.next() else {
                break;
            };
            let pipeline = Arc::clone(&pipeline);
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let url = req.source_url.clone();
                let res = tokio::task::spawn_blocking(move || pipeline.run_job(&req, &cancel))
                    .await
                    .unwrap_or_else(|e| Err(JobError::Panicked(e.to_string())));
                (index, url, res)
            });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok((index, url, res)) => {
                match &res {
                    Ok(report) if report.is_success() => {
                        tracing::info!(job = index, url = %url, output = %report.output_path.display(), "job finished")
                    }
                    Ok(report) => tracing::warn!(
                        job = index,
                        url = %url,
                        failed_segments = report.fetch.failures().len(),
                        "job finished incomplete"
                    ),
                    Err(e) => tracing::error!(job = index, url = %url, error = %e, "job failed"),
                }
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(res);
                }
            }
            // The outer task only awaits the blocking one; it cannot panic on its own.
            Err(e) => tracing::error!(error = %e, "batch task join failed"),
        }
    }

    let results = slots
        .into_iter()
        .map(|slot| match slot {
            Some(res) => res,
            None if cancel.is_cancelled() => Err(JobCancelled.into()),
            None => Err(JobError::Panicked("job task lost".to_string())),
        })
        .collect();
    BatchReport { results }
}
