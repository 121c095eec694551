//! On-disk file lifecycle for segments and assembled output.
//!
//! Every file is written to a `.part` sibling first and renamed into place
//! only after the last byte is synced, so a file at its final path is always
//! complete. Failed writes remove their `.part` file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `index3.ts` → `index3.ts.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// True when `path` already holds a non-empty file (the resume check).
pub fn is_present(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Buffered writer for a `.part` file that is either finalized or discarded.
/// Dropping it without `finalize` removes the temp file.
pub struct PartFile {
    writer: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create (truncating any stale leftover) the temp file for `final_path`.
    pub fn create(final_path: &Path, buffer_size: usize) -> io::Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            writer: Some(BufWriter::with_capacity(buffer_size.max(1), file)),
            temp_path,
            final_path: final_path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        let w = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "part file already closed"))?;
        w.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Append everything readable from `reader`; returns the bytes copied.
    pub fn copy_from<R: io::Read>(&mut self, reader: &mut R) -> io::Result<u64> {
        let w = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "part file already closed"))?;
        let n = io::copy(reader, w)?;
        self.written += n;
        Ok(n)
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, sync and atomically rename the temp file to the final path.
    /// Returns the number of bytes in the finished file.
    pub fn finalize(mut self) -> io::Result<u64> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "part file already closed"))?;
        let result = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .and_then(|()| std::fs::rename(&self.temp_path, &self.final_path));
        if let Err(e) = result {
            remove_partial(&self.temp_path);
            return Err(e);
        }
        Ok(self.written)
    }

    /// Close and delete the temp file.
    pub fn discard(mut self) {
        self.writer.take();
        remove_partial(&self.temp_path);
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            remove_partial(&self.temp_path);
        }
    }
}

/// Best-effort removal of a partial file; a missing file is not an error.
pub fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("index7.ts"));
        assert_eq!(p.to_string_lossy(), "index7.ts.part");
        let p2 = temp_path(Path::new("/tmp/out/video.mp4"));
        assert_eq!(p2.to_string_lossy(), "/tmp/out/video.mp4.part");
    }

    #[test]
    fn finalize_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("index0.ts");
        let mut part = PartFile::create(&final_path, 16).unwrap();
        part.write_chunk(b"hello ").unwrap();
        part.write_chunk(b"world").unwrap();
        assert!(part.temp_path().exists());
        assert!(!final_path.exists());
        assert_eq!(part.finalize().unwrap(), 11);
        assert!(!temp_path(&final_path).exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"hello world");
        assert!(is_present(&final_path));
    }

    #[test]
    fn drop_without_finalize_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("index1.ts");
        {
            let mut part = PartFile::create(&final_path, 16).unwrap();
            part.write_chunk(b"partial").unwrap();
        }
        assert!(!temp_path(&final_path).exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn discard_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("index2.ts");
        let part = PartFile::create(&final_path, 16).unwrap();
        part.discard();
        assert!(!temp_path(&final_path).exists());
    }

    #[test]
    fn empty_file_is_not_present() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("index3.ts");
        assert!(!is_present(&p));
        std::fs::write(&p, b"").unwrap();
        assert!(!is_present(&p));
        std::fs::write(&p, b"x").unwrap();
        assert!(is_present(&p));
    }
}
