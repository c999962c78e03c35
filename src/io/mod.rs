mod http;
mod local;
mod memory;

pub use http::{HttpRangeReader, HttpSource};
pub use local::LocalFileReader;
pub use memory::{MemoryReader, MemorySource};

use anyhow::Result;

/// Trait for random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer starting at `offset`, failing with
    /// `UnexpectedEof` if the source ends first.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "short read at offset {}: wanted {} bytes, got {}",
                        offset,
                        buf.len(),
                        filled
                    ),
                )
                .into());
            }
            filled += n;
        }
        Ok(())
    }
}

/// Something that identifies an archive and can open a fresh reader for it.
///
/// Every container operation calls [`open`](ArchiveSource::open) once and
/// drops the returned reader before it returns, so implementations must not
/// hand out a shared, cached handle.
pub trait ArchiveSource: Send + Sync {
    type Reader: ReadAt;

    /// Open a new reader over the archive bytes
    fn open(&self) -> Result<Self::Reader>;

    /// Human readable location, used in log lines and error messages
    fn location(&self) -> String;
}

impl ArchiveSource for std::path::PathBuf {
    type Reader = LocalFileReader;

    fn open(&self) -> Result<LocalFileReader> {
        LocalFileReader::new(self)
    }

    fn location(&self) -> String {
        self.display().to_string()
    }
}

/// Convert a reader error into an `io::Error`, keeping the original
/// `io::Error` when there is one underneath.
pub(crate) fn into_io_error(err: anyhow::Error) -> std::io::Error {
    match err.downcast::<std::io::Error>() {
        Ok(io) => io,
        Err(other) => std::io::Error::other(other),
    }
}
