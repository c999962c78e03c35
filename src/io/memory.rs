use super::{ArchiveSource, ReadAt};
use anyhow::Result;
use std::sync::Arc;

/// Reader over bytes that are already in memory
pub struct MemoryReader {
    data: Arc<[u8]>,
}

impl ReadAt for MemoryReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let len = self.data.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// An archive held in memory, e.g. an APK that was already downloaded.
///
/// Opening is a reference count bump, so every call still gets its own
/// reader.
#[derive(Clone)]
pub struct MemorySource {
    name: String,
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl ArchiveSource for MemorySource {
    type Reader = MemoryReader;

    fn open(&self) -> Result<MemoryReader> {
        Ok(MemoryReader {
            data: Arc::clone(&self.data),
        })
    }

    fn location(&self) -> String {
        format!("memory:{}", self.name)
    }
}
