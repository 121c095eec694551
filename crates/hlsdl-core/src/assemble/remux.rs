//! Remux through an external tool (ffmpeg's concat demuxer, stream copy).
//!
//! The tool is a capability behind [`Remuxer`]; this module only writes the
//! ordered file list and interprets nothing beyond the exit status.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use super::{AssembleError, Manifest};

/// Runs the external remux step: read the concat list at `manifest_path`,
/// write `output_path`.
pub trait Remuxer: Send + Sync {
    fn remux(&self, manifest_path: &Path, output_path: &Path) -> io::Result<ExitStatus>;
}

/// ffmpeg invoked as `-f concat -safe 0 -i <list> -c copy <output>`.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    program: PathBuf,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use the configured binary when it exists, otherwise look `ffmpeg` up on PATH.
    pub fn locate(configured: Option<&Path>) -> Result<Self, AssembleError> {
        if let Some(path) = configured {
            if path.exists() {
                return Ok(Self::new(path));
            }
            tracing::warn!(path = %path.display(), "configured ffmpeg not found, trying PATH");
        }
        which::which("ffmpeg")
            .map(Self::new)
            .map_err(|_| AssembleError::ToolNotFound("ffmpeg".to_string()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn command(&self, manifest_path: &Path, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-hide_banner")
            .arg("-y")
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(manifest_path)
            .args(["-c", "copy"])
            .arg(output_path);
        cmd
    }
}

impl Remuxer for FfmpegRemuxer {
    fn remux(&self, manifest_path: &Path, output_path: &Path) -> io::Result<ExitStatus> {
        let output = self
            .command(manifest_path, output_path)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            for line in tail.into_iter().rev() {
                tracing::warn!(target: "hlsdl_core::remux", "ffmpeg: {}", line);
            }
        }
        Ok(output.status)
    }
}

#[derive(Debug, Clone)]
pub struct RemuxSummary {
    pub output: PathBuf,
    pub status: ExitStatus,
    pub segments: usize,
    pub missing: Vec<usize>,
}

impl RemuxSummary {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Write one `file '<absolute path>'` line per manifest entry, in order.
pub fn write_manifest_lines<W: Write>(manifest: &Manifest, mut w: W) -> io::Result<()> {
    for entry in manifest.entries() {
        let path = entry.path.to_string_lossy();
        writeln!(w, "file '{}'", path.replace('\'', r"'\''"))?;
    }
    w.flush()
}

/// Remux the segment files of `output_dir`, in index order, into `output_file`.
///
/// The file list is a temp file inside `output_dir`, unique per call and removed
/// afterwards, so concurrent jobs never share one. A nonzero exit status is
/// logged and returned in the summary, not raised.
pub fn remux(
    output_dir: &Path,
    output_file: &Path,
    remuxer: &dyn Remuxer,
    expected: Option<usize>,
) -> Result<RemuxSummary, AssembleError> {
    let abs_dir = std::fs::canonicalize(output_dir)
        .map_err(|e| AssembleError::io(format!("resolve {}", output_dir.display()), e))?;
    let manifest = Manifest::scan(&abs_dir)?;
    if manifest.is_empty() {
        return Err(AssembleError::NoSegments(output_dir.to_path_buf()));
    }
    let missing = manifest.warn_gaps(output_dir, expected);

    let mut list = tempfile::Builder::new()
        .prefix("filelist-")
        .suffix(".txt")
        .tempfile_in(&abs_dir)
        .map_err(|e| AssembleError::io("create remux file list", e))?;
    write_manifest_lines(&manifest, list.as_file_mut())
        .map_err(|e| AssembleError::io("write remux file list", e))?;

    tracing::debug!(list = %list.path().display(), output = %output_file.display(), "running remux");
    let status = remuxer
        .remux(list.path(), output_file)
        .map_err(AssembleError::Spawn)?;
    if status.success() {
        tracing::info!(output = %output_file.display(), segments = manifest.len(), "remuxed segments");
    } else {
        tracing::warn!(output = %output_file.display(), %status, "remux tool exited with failure");
    }

    Ok(RemuxSummary {
        output: output_file.to_path_buf(),
        status,
        segments: manifest.len(),
        missing,
    })
}
