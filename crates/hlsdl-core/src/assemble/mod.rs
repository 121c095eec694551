//! Reassembly of downloaded segments into one output file.
//!
//! Both strategies start from the same [`Manifest`]: the segment files present
//! in a job directory, ordered by the numeric index in their name (index2
//! before index10). Gaps in the index sequence are logged and reported.

mod concat;
mod remux;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::segment::parse_segment_index;

pub use concat::{concat, ConcatSummary};
pub use remux::{remux, write_manifest_lines, FfmpegRemuxer, RemuxSummary, Remuxer};

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("no segment files found in {0}")]
    NoSegments(PathBuf),
    #[error("failed to start remux tool: {0}")]
    Spawn(#[source] io::Error),
    #[error("remux tool not found: {0}")]
    ToolNotFound(String),
}

impl AssembleError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        AssembleError::Io {
            context: context.into(),
            source,
        }
    }
}

/// One segment file selected for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub index: usize,
    pub path: PathBuf,
}

/// Segment files of a directory in ascending numeric index order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Scan `dir` for `index<N>.ts` files. Other names (temp `.part` files,
    /// the output file, the remux file list) are ignored.
    pub fn scan(dir: &Path) -> Result<Self, AssembleError> {
        let read_dir = std::fs::read_dir(dir)
            .map_err(|e| AssembleError::io(format!("read segment dir {}", dir.display()), e))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry
                .map_err(|e| AssembleError::io(format!("read segment dir {}", dir.display()), e))?;
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(parse_segment_index) else {
                continue;
            };
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            entries.push(ManifestEntry {
                index,
                path: entry.path(),
            });
        }
        entries.sort_by_key(|e| e.index);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices absent from the sequence `0..expected` (or `0..=max present index`
    /// when the expected count is unknown).
    pub fn missing_indices(&self, expected: Option<usize>) -> Vec<usize> {
        let upper = match expected {
            Some(n) => n,
            None => self.entries.last().map(|e| e.index + 1).unwrap_or(0),
        };
        let mut present = self.entries.iter().map(|e| e.index).peekable();
        let mut missing = Vec::new();
        for i in 0..upper {
            while present.peek().is_some_and(|&p| p < i) {
                present.next();
            }
            if present.peek() != Some(&i) {
                missing.push(i);
            }
        }
        missing
    }

    /// Log a warning when the sequence has gaps; returns the missing indices.
    pub(crate) fn warn_gaps(&self, dir: &Path, expected: Option<usize>) -> Vec<usize> {
        let missing = self.missing_indices(expected);
        if !missing.is_empty() {
            tracing::warn!(
                dir = %dir.display(),
                missing = ?missing,
                "segment sequence has gaps; output will skip them"
            );
        }
        missing
    }
}
