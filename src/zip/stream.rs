//! Readers over the data of a single entry.

use flate2::read::DeflateDecoder;
use std::io::{self, Read};

use crate::io::{into_io_error, ReadAt};

use super::structures::CompressionMethod;

/// Sequential reader over `[pos, end)` of a random-access source.
struct RangeReader<'a, R: ReadAt> {
    reader: &'a R,
    pos: u64,
    end: u64,
}

impl<R: ReadAt> Read for RangeReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.end - self.pos;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);
        let n = self
            .reader
            .read_at(self.pos, &mut buf[..want])
            .map_err(into_io_error)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry data truncated at offset {}", self.pos),
            ));
        }

        self.pos += n as u64;
        Ok(n)
    }
}

enum Inner<'a, R: ReadAt> {
    Stored(RangeReader<'a, R>),
    Deflate(DeflateDecoder<RangeReader<'a, R>>),
}

/// Uncompressed byte stream of one archive entry.
///
/// Borrows the archive's reader, so it can't outlive the open archive.
pub struct EntryReader<'a, R: ReadAt> {
    inner: Inner<'a, R>,
}

impl<'a, R: ReadAt> EntryReader<'a, R> {
    pub(super) fn new(
        reader: &'a R,
        method: CompressionMethod,
        data_offset: u64,
        compressed_size: u64,
    ) -> Self {
        let range = RangeReader {
            reader,
            pos: data_offset,
            end: data_offset.saturating_add(compressed_size),
        };
        let inner = match method {
            CompressionMethod::Deflate => Inner::Deflate(DeflateDecoder::new(range)),
            // Unknown methods are rejected before a stream is opened
            CompressionMethod::Stored | CompressionMethod::Unknown(_) => Inner::Stored(range),
        };
        Self { inner }
    }
}

impl<R: ReadAt> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Stored(r) => r.read(buf),
            Inner::Deflate(r) => r.read(buf),
        }
    }
}
