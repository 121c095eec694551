//! `hlsdl remux` – remux already-downloaded segments with ffmpeg.

use anyhow::{Context, Result};
use hlsdl_core::assemble::{self, FfmpegRemuxer};
use std::path::{Path, PathBuf};

pub async fn run_remux(dir: &Path, output: &Path, ffmpeg: Option<&Path>) -> Result<()> {
    let remuxer = FfmpegRemuxer::locate(ffmpeg)?;
    tracing::debug!(ffmpeg = %remuxer.program().display(), "remuxing {}", dir.display());
    let (dir_buf, out_buf): (PathBuf, PathBuf) = (dir.to_path_buf(), output.to_path_buf());
    let summary =
        tokio::task::spawn_blocking(move || assemble::remux(&dir_buf, &out_buf, &remuxer, None))
            .await
            .context("remux task")?
            .with_context(|| format!("remuxing segments from {}", dir.display()))?;
    if !summary.success() {
        anyhow::bail!("ffmpeg exited with {}", summary.status);
    }
    println!(
        "Wrote {} ({} segments)",
        summary.output.display(),
        summary.segments
    );
    if !summary.missing.is_empty() {
        println!("Missing segment indices: {:?}", summary.missing);
    }
    Ok(())
}
