//! Segments and the per-playlist job description.
//!
//! A segment's local file name depends only on its index (`index{N}.ts`), so
//! the same job always maps to the same files and re-runs are idempotent.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

const SEGMENT_PREFIX: &str = "index";
const SEGMENT_EXT: &str = "ts";

/// File name for the segment at `index`.
pub fn segment_file_name(index: usize) -> String {
    format!("{}{}.{}", SEGMENT_PREFIX, index, SEGMENT_EXT)
}

/// Inverse of [`segment_file_name`]: `index12.ts` → `Some(12)`.
/// Anything else (temp files, the output file, `index.ts`, `indexab.ts`) → `None`.
pub fn parse_segment_index(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_EXT)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Resolve a playlist entry against the playlist URL. Absolute URIs pass through.
pub fn resolve_uri(base: &Url, uri: &str) -> Result<Url, JobBuildError> {
    base.join(uri.trim()).map_err(|source| JobBuildError::BadSegmentUri {
        uri: uri.to_string(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum JobBuildError {
    #[error("invalid playlist URL {url}: {source}")]
    BadPlaylistUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("cannot resolve segment URI {uri}: {source}")]
    BadSegmentUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
}

/// One media segment of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0-based position in the playlist; defines playback order.
    pub index: usize,
    /// Absolute URL (relative playlist entries are resolved at job construction).
    pub uri: String,
    pub local_path: PathBuf,
}

/// Everything needed to fetch one playlist's segments. Immutable once built.
#[derive(Debug, Clone)]
pub struct PlaylistJob {
    source_url: Url,
    segments: Vec<Segment>,
    output_dir: PathBuf,
    output_file: PathBuf,
    max_concurrency: usize,
}

impl PlaylistJob {
    /// Build a job from the ordered URIs of `source_url`.
    /// Relative URIs are resolved against `source_url`; `max_concurrency` is clamped to at least 1.
    pub fn new(
        source_url: &str,
        uris: &[String],
        output_dir: &Path,
        output_file: &Path,
        max_concurrency: usize,
    ) -> Result<Self, JobBuildError> {
        let base = Url::parse(source_url).map_err(|source| JobBuildError::BadPlaylistUrl {
            url: source_url.to_string(),
            source,
        })?;
        let segments = uris
            .iter()
            .enumerate()
            .map(|(index, uri)| {
                Ok(Segment {
                    index,
                    uri: resolve_uri(&base, uri)?.to_string(),
                    local_path: output_dir.join(segment_file_name(index)),
                })
            })
            .collect::<Result<Vec<_>, JobBuildError>>()?;
        Ok(Self {
            source_url: base,
            segments,
            output_dir: output_dir.to_path_buf(),
            output_file: output_file.to_path_buf(),
            max_concurrency: max_concurrency.max(1),
        })
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}
