//! Byte sinks the Parquet writer streams into.

use crate::error::{Result, WriterError};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination for encoded bytes.
///
/// `position` is the number of bytes accepted so far, which after the writer
/// closes equals the output size.
pub trait OutputSink: Write + Send {
    fn position(&self) -> u64;

    fn truncate(&mut self, len: u64) -> Result<()>;

    /// Flush buffered bytes and make them durable.
    fn finish(&mut self) -> Result<()>;
}

/// Local file destination
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    inner: BufWriter<File>,
    written: u64,
}

impl FileSink {
    /// Create the file at `path`.
    ///
    /// With `overwrite`, an existing file is deleted first; without it an
    /// existing file is an error.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let path = path.as_ref();
        if overwrite && path.exists() {
            std::fs::remove_file(path).map_err(|e| {
                WriterError::io(format!("Failed to remove existing {}", path.display()), e)
            })?;
            debug!(path = %path.display(), "removed existing output file");
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| WriterError::io(format!("Failed to create {}", path.display()), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl OutputSink for FileSink {
    fn position(&self) -> u64 {
        self.written
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        let path = self.path.display().to_string();
        self.inner
            .flush()
            .map_err(|e| WriterError::io(format!("Failed to flush {}", path), e))?;
        let file = self.inner.get_mut();
        file.set_len(len)
            .and_then(|_| file.seek(SeekFrom::Start(len)).map(|_| ()))
            .map_err(|e| WriterError::io(format!("Failed to truncate {}", path), e))?;
        self.written = len;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let path = self.path.display().to_string();
        self.inner
            .flush()
            .and_then(|_| self.inner.get_ref().sync_all())
            .map_err(|e| WriterError::io(format!("Failed to sync {}", path), e))
    }
}

/// In-memory destination; the encoded file is available after close.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputSink for MemorySink {
    fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(WriterError::unsupported("truncate"))
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn memory_sink_tracks_position() {
        let mut sink = MemorySink::new();
        sink.write_all(b"PAR1").unwrap();
        sink.write_all(&[0u8; 12]).unwrap();
        assert_eq!(sink.position(), 16);
        assert_eq!(&sink.as_bytes()[..4], b"PAR1");
    }

    #[test]
    fn memory_sink_truncate_always_fails() {
        let mut sink = MemorySink::new();
        for len in [0, 4, 1024] {
            let err = sink.truncate(len).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E004Unsupported);
        }
        sink.write_all(b"abcd").unwrap();
        assert!(sink.truncate(2).is_err());
        assert_eq!(sink.as_bytes(), b"abcd");
    }

    #[test]
    fn file_sink_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        std::fs::write(&path, b"stale contents").unwrap();

        let mut sink = FileSink::create(&path, true).unwrap();
        sink.write_all(b"new").unwrap();
        sink.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(sink.position(), 3);
    }

    #[test]
    fn file_sink_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        std::fs::write(&path, b"keep").unwrap();

        let err = FileSink::create(&path, false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::E002Io);
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    }

    #[test]
    fn file_sink_truncate_shrinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");

        let mut sink = FileSink::create(&path, true).unwrap();
        sink.write_all(b"0123456789").unwrap();
        sink.truncate(4).unwrap();
        sink.write_all(b"ab").unwrap();
        sink.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"0123ab");
        assert_eq!(sink.position(), 6);
    }
}
