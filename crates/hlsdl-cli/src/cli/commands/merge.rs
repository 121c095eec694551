//! `hlsdl merge` – concatenate already-downloaded segments.

use anyhow::{Context, Result};
use hlsdl_core::assemble;
use std::path::{Path, PathBuf};

pub async fn run_merge(dir: &Path, output: &Path) -> Result<()> {
    let (dir_buf, out_buf): (PathBuf, PathBuf) = (dir.to_path_buf(), output.to_path_buf());
    let summary = tokio::task::spawn_blocking(move || assemble::concat(&dir_buf, &out_buf, None))
        .await
        .context("merge task")?
        .with_context(|| format!("merging segments from {}", dir.display()))?;
    println!(
        "Wrote {} ({} segments, {} bytes)",
        summary.output.display(),
        summary.segments,
        summary.bytes_written
    );
    if !summary.missing.is_empty() {
        println!("Missing segment indices: {:?}", summary.missing);
    }
    Ok(())
}
