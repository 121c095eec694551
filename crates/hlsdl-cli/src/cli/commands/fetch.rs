//! `hlsdl fetch` – download and assemble one or more playlists.

use anyhow::{Context, Result};
use hlsdl_core::batch;
use hlsdl_core::config::{AssembleMode, HlsdlConfig};
use hlsdl_core::control::CancelToken;
use hlsdl_core::pipeline::{JobRequest, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub urls: Vec<String>,
    pub output_dir_prefix: String,
    pub output_name_prefix: String,
    pub ext: String,
    pub max_concurrency: Option<usize>,
    pub batch_concurrency: Option<usize>,
    pub mode: Option<AssembleMode>,
    pub ffmpeg: Option<PathBuf>,
}

/// Job i: segments in `<dir_prefix>_<i>`, output `<name_prefix>_<i>.<ext>` inside it.
pub fn job_requests(args: &FetchArgs) -> Vec<JobRequest> {
    let ext = args.ext.trim_start_matches('.');
    args.urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            JobRequest::new(
                url.clone(),
                format!("{}_{}", args.output_dir_prefix, i),
                format!("{}_{}.{}", args.output_name_prefix, i, ext),
            )
        })
        .collect()
}

fn apply_overrides(mut cfg: HlsdlConfig, args: &FetchArgs) -> HlsdlConfig {
    if let Some(n) = args.max_concurrency {
        cfg.max_concurrency = n;
    }
    if let Some(n) = args.batch_concurrency {
        cfg.max_batch_concurrency = n;
    }
    if let Some(mode) = args.mode {
        cfg.assemble_mode = mode;
    }
    if let Some(path) = &args.ffmpeg {
        cfg.ffmpeg_path = Some(path.clone());
    }
    cfg
}

pub async fn run_fetch(cfg: HlsdlConfig, args: FetchArgs) -> Result<()> {
    let cfg = apply_overrides(cfg, &args);
    let pipeline = Arc::new(Pipeline::from_config(&cfg).context("cannot set up remuxing")?);
    let requests = job_requests(&args);

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted, stopping downloads...");
            on_signal.cancel();
        }
    });

    let report = batch::run_all(pipeline, requests, cfg.limits().batch, cancel).await;
    for (i, (url, result)) in args.urls.iter().zip(report.results()).enumerate() {
        match result {
            Ok(job) => {
                let f = &job.fetch;
                println!(
                    "[{}] {}: {} downloaded, {} already present, {} failed",
                    i,
                    url,
                    f.downloaded(),
                    f.skipped(),
                    f.failures().len()
                );
                for (index, outcome) in f.failures() {
                    println!("    segment {}: {}", index, outcome);
                }
                for step in &job.assembly {
                    println!("    {}", step);
                }
            }
            Err(e) => println!("[{}] {}: {}", i, url, e),
        }
    }

    let failed = report.failed();
    if failed > 0 {
        anyhow::bail!("{} of {} job(s) did not complete", failed, report.len());
    }
    Ok(())
}
