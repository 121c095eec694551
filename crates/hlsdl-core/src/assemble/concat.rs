//! Raw byte concatenation of segment files.
//!
//! Produces a playable file only when the segments are raw MPEG-TS; other
//! containers go through the remux path.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::{AssembleError, Manifest};
use crate::storage::PartFile;

const COPY_BUFFER: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatSummary {
    pub output: PathBuf,
    pub bytes_written: u64,
    pub segments: usize,
    /// Indices absent from the segment sequence (not in the output).
    pub missing: Vec<usize>,
}

/// Concatenate every segment file of `output_dir`, in index order, into `output_file`.
///
/// The output is written to `<output_file>.part` and renamed when complete, so a
/// failure (e.g. an unreadable segment) leaves no truncated output behind.
/// `expected` is the playlist's segment count, used only to report trailing gaps.
pub fn concat(
    output_dir: &Path,
    output_file: &Path,
    expected: Option<usize>,
) -> Result<ConcatSummary, AssembleError> {
    let manifest = Manifest::scan(output_dir)?;
    if manifest.is_empty() {
        return Err(AssembleError::NoSegments(output_dir.to_path_buf()));
    }
    let missing = manifest.warn_gaps(output_dir, expected);

    let mut out = PartFile::create(output_file, COPY_BUFFER)
        .map_err(|e| AssembleError::io(format!("create {}", output_file.display()), e))?;
    for entry in manifest.entries() {
        let mut f = File::open(&entry.path)
            .map_err(|e| AssembleError::io(format!("open segment {}", entry.path.display()), e))?;
        out.copy_from(&mut f)
            .map_err(|e| AssembleError::io(format!("append segment {}", entry.path.display()), e))?;
    }
    let bytes_written = out
        .finalize()
        .map_err(|e| AssembleError::io(format!("finalize {}", output_file.display()), e))?;

    tracing::info!(
        output = %output_file.display(),
        segments = manifest.len(),
        bytes = bytes_written,
        "merged segments"
    );
    Ok(ConcatSummary {
        output: output_file.to_path_buf(),
        bytes_written,
        segments: manifest.len(),
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn index_two_precedes_index_ten() {
        let dir = tempfile::tempdir().unwrap();
        let mut expected = Vec::new();
        for i in 0..=10usize {
            let body = format!("<seg{}>", i);
            fs::write(dir.path().join(format!("index{}.ts", i)), body.as_bytes()).unwrap();
            expected.extend_from_slice(body.as_bytes());
        }
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("video.ts");
        let summary = concat(dir.path(), &out, Some(11)).unwrap();
        assert_eq!(fs::read(&out).unwrap(), expected);
        assert_eq!(summary.bytes_written, expected.len() as u64);
        assert_eq!(summary.segments, 11);
        assert!(summary.missing.is_empty());
    }

    #[test]
    fn gaps_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index0.ts"), b"a").unwrap();
        fs::write(dir.path().join("index2.ts"), b"c").unwrap();
        let out = dir.path().join("merged.mp4");
        let summary = concat(dir.path(), &out, Some(4)).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"ac");
        assert_eq!(summary.missing, vec![1, 3]);
    }

    #[test]
    fn output_in_same_dir_is_not_picked_up_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index0.ts"), b"one").unwrap();
        fs::write(dir.path().join("index1.ts"), b"two").unwrap();
        let out = dir.path().join("output_video_0.mp4");
        concat(dir.path(), &out, None).unwrap();
        concat(dir.path(), &out, None).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"onetwo");
    }

    #[test]
    fn empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = concat(dir.path(), &dir.path().join("o.ts"), None).unwrap_err();
        assert!(matches!(err, AssembleError::NoSegments(_)));
        assert!(!dir.path().join("o.ts").exists());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_segment_fails_without_output() {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index0.ts"), b"ok").unwrap();
        // Dangling symlink: listed by name, fails to open.
        symlink(dir.path().join("gone"), dir.path().join("index1.ts")).unwrap();
        let out = dir.path().join("out.ts");
        let err = concat(dir.path(), &out, None).unwrap_err();
        assert!(matches!(err, AssembleError::Io { .. }));
        assert!(err.to_string().contains("index1.ts"));
        assert!(!out.exists());
        assert!(!crate::storage::temp_path(&out).exists());
    }
}
