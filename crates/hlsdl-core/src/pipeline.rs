//! One playlist end to end: load the playlist, fetch every segment, assemble.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::assemble::{self, AssembleError, ConcatSummary, FfmpegRemuxer, RemuxSummary, Remuxer};
use crate::config::{AssembleMode, HlsdlConfig};
use crate::control::{CancelToken, JobCancelled};
use crate::fetcher::{Fetch, SegmentFetcher};
use crate::playlist::{HttpPlaylistSource, PlaylistError, PlaylistSource};
use crate::scheduler::{self, FetchReport};
use crate::segment::{JobBuildError, PlaylistJob};

/// Caller-side description of a job, before its playlist is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub source_url: String,
    pub output_dir: PathBuf,
    /// Relative paths are placed inside `output_dir`.
    pub output_file: PathBuf,
}

impl JobRequest {
    pub fn new(
        source_url: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            output_dir: output_dir.into(),
            output_file: output_file.into(),
        }
    }

    /// Where the assembled file ends up.
    pub fn output_path(&self) -> PathBuf {
        if self.output_file.is_absolute() {
            self.output_file.clone()
        } else {
            self.output_dir.join(&self.output_file)
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("playlist URL not reachable: {0}")]
    PlaylistUnreachable(String),
    #[error("failed to load playlist {url}: {source}")]
    Playlist { url: String, source: PlaylistError },
    #[error(transparent)]
    Build(#[from] JobBuildError),
    #[error("cannot create output directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("assembly failed: {0}")]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Cancelled(#[from] JobCancelled),
    #[error("job task failed: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone)]
pub enum AssemblyOutcome {
    Concat(ConcatSummary),
    Remux(RemuxSummary),
}

impl AssemblyOutcome {
    pub fn output(&self) -> &Path {
        match self {
            AssemblyOutcome::Concat(s) => &s.output,
            AssemblyOutcome::Remux(s) => &s.output,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            AssemblyOutcome::Concat(_) => true,
            AssemblyOutcome::Remux(s) => s.success(),
        }
    }
}

impl fmt::Display for AssemblyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyOutcome::Concat(s) => write!(
                f,
                "concatenated {} segments ({} bytes) into {}",
                s.segments,
                s.bytes_written,
                s.output.display()
            ),
            AssemblyOutcome::Remux(s) if s.success() => {
                write!(f, "remuxed {} segments into {}", s.segments, s.output.display())
            }
            AssemblyOutcome::Remux(s) => {
                write!(f, "remux of {} failed ({})", s.output.display(), s.status)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub source_url: String,
    pub output_path: PathBuf,
    pub fetch: FetchReport,
    pub assembly: Vec<AssemblyOutcome>,
}

impl JobReport {
    /// Every segment on disk and every assembly step succeeded.
    pub fn is_success(&self) -> bool {
        self.fetch.is_complete() && self.assembly.iter().all(AssemblyOutcome::success)
    }
}

/// Output path of the remux step when both assemblers run: `video.mp4` → `video.remux.mp4`.
pub fn remux_sibling(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}.remux.{}", stem, ext.to_string_lossy()),
        None => format!("{}.remux", stem),
    };
    output.with_file_name(name)
}

/// Shared, immutable job runner. One instance serves every job of a batch.
pub struct Pipeline {
    playlists: Arc<dyn PlaylistSource>,
    fetcher: Arc<dyn Fetch>,
    remuxer: Option<Arc<dyn Remuxer>>,
    mode: AssembleMode,
    max_concurrency: usize,
}

impl Pipeline {
    pub fn new(playlists: Arc<dyn PlaylistSource>, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            playlists,
            fetcher,
            remuxer: None,
            mode: AssembleMode::Concat,
            max_concurrency: 1,
        }
    }

    /// curl-backed pipeline from config. Locates ffmpeg only when the mode needs it.
    pub fn from_config(cfg: &HlsdlConfig) -> Result<Self, AssembleError> {
        let opts = cfg.http_options();
        let mut pipeline = Self::new(
            Arc::new(HttpPlaylistSource::new(opts.clone())),
            Arc::new(SegmentFetcher::new(opts, cfg.retry_policy())),
        )
        .with_mode(cfg.assemble_mode)
        .with_max_concurrency(cfg.limits().per_job);
        if cfg.assemble_mode != AssembleMode::Concat {
            let ffmpeg = FfmpegRemuxer::locate(cfg.ffmpeg_path.as_deref())?;
            tracing::debug!(ffmpeg = %ffmpeg.program().display(), "using remux tool");
            pipeline = pipeline.with_remuxer(Arc::new(ffmpeg));
        }
        Ok(pipeline)
    }

    pub fn with_remuxer(mut self, remuxer: Arc<dyn Remuxer>) -> Self {
        self.remuxer = Some(remuxer);
        self
    }

    pub fn with_mode(mut self, mode: AssembleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn mode(&self) -> AssembleMode {
        self.mode
    }

    /// Run one job. Blocks; call from `spawn_blocking` in async code.
    ///
    /// Segment failures are reported in the returned `FetchReport` and do not
    /// fail the job; assembly still runs over the segments that are on disk.
    pub fn run_job(&self, req: &JobRequest, cancel: &CancelToken) -> Result<JobReport, JobError> {
        if cancel.is_cancelled() {
            return Err(JobCancelled.into());
        }
        let uris = self.playlists.load(&req.source_url).map_err(|e| match e {
            PlaylistError::Unreachable(url) => JobError::PlaylistUnreachable(url),
            source => JobError::Playlist {
                url: req.source_url.clone(),
                source,
            },
        })?;

        std::fs::create_dir_all(&req.output_dir).map_err(|source| JobError::CreateDir {
            path: req.output_dir.clone(),
            source,
        })?;
        let output_path = req.output_path();
        let job = PlaylistJob::new(
            &req.source_url,
            &uris,
            &req.output_dir,
            &output_path,
            self.max_concurrency,
        )?;

        let fetch = scheduler::run_fetch(&job, Arc::clone(&self.fetcher), cancel);
        for (index, outcome) in fetch.failures() {
            tracing::warn!(url = %req.source_url, index, %outcome, "segment not available");
        }
        tracing::info!(
            url = %req.source_url,
            downloaded = fetch.downloaded(),
            skipped = fetch.skipped(),
            failed = fetch.failures().len(),
            bytes = fetch.bytes_downloaded(),
            "fetch finished"
        );
        if cancel.is_cancelled() {
            return Err(JobCancelled.into());
        }

        let assembly = self.assemble(&job, &output_path)?;
        Ok(JobReport {
            source_url: req.source_url.clone(),
            output_path,
            fetch,
            assembly,
        })
    }

    fn assemble(&self, job: &PlaylistJob, output: &Path) -> Result<Vec<AssemblyOutcome>, AssembleError> {
        let expected = Some(job.segments().len());
        let dir = job.output_dir();
        let mut done = Vec::new();
        if matches!(self.mode, AssembleMode::Concat | AssembleMode::Both) {
            let summary = assemble::concat(dir, output, expected)?;
            done.push(AssemblyOutcome::Concat(summary));
        }
        if matches!(self.mode, AssembleMode::Remux | AssembleMode::Both) {
            let remuxer = self
                .remuxer
                .as_deref()
                .ok_or_else(|| AssembleError::ToolNotFound("ffmpeg".to_string()))?;
            let target = match self.mode {
                AssembleMode::Both => remux_sibling(output),
                _ => output.to_path_buf(),
            };
            let summary = assemble::remux(dir, &target, remuxer, expected)?;
            done.push(AssemblyOutcome::Remux(summary));
        }
        Ok(done)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::fetcher::FetchOutcome;
    use crate::segment::Segment;
    use std::collections::HashMap;
    use std::collections::HashSet;

    /// Playlists keyed by URL; unknown URLs are unreachable.
    #[derive(Default)]
    pub struct MapPlaylists {
        pub lists: HashMap<String, Vec<String>>,
    }

    impl MapPlaylists {
        pub fn with(mut self, url: &str, uris: &[&str]) -> Self {
            self.lists
                .insert(url.to_string(), uris.iter().map(|u| u.to_string()).collect());
            self
        }
    }

    impl PlaylistSource for MapPlaylists {
        fn load(&self, url: &str) -> Result<Vec<String>, PlaylistError> {
            self.lists
                .get(url)
                .cloned()
                .ok_or_else(|| PlaylistError::Unreachable(url.to_string()))
        }
    }

    /// Writes `seg<index>` into each segment file, except for URIs listed as broken.
    #[derive(Default)]
    pub struct WritingFetch {
        pub broken: HashSet<String>,
    }

    impl Fetch for WritingFetch {
        fn fetch(&self, segment: &Segment, _cancel: &CancelToken) -> FetchOutcome {
            if self.broken.contains(&segment.uri) {
                return FetchOutcome::Unreachable;
            }
            let body = format!("seg{}", segment.index);
            match std::fs::write(&segment.local_path, &body) {
                Ok(()) => FetchOutcome::Success {
                    bytes: body.len() as u64,
                },
                Err(e) => FetchOutcome::TransferError {
                    reason: e.to_string(),
                },
            }
        }
    }
}
