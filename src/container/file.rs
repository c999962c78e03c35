use std::fmt;
use std::sync::Arc;

use crate::dex::{DexHeader, HeaderError, Opcodes};

use super::{ContainerId, MultiDexFile};

/// A dex file loaded out of a [`ZipDexContainer`](super::ZipDexContainer).
///
/// Immutable once built. Cloning shares the underlying bytes.
#[derive(Clone)]
pub struct ZipDexFile {
    buf: Arc<[u8]>,
    entry_name: String,
    opcodes: Arc<Opcodes>,
    container: ContainerId,
}

impl ZipDexFile {
    pub(crate) fn new(
        opcodes: Arc<Opcodes>,
        buf: Vec<u8>,
        entry_name: String,
        container: ContainerId,
    ) -> Self {
        Self {
            buf: buf.into(),
            entry_name,
            opcodes,
            container,
        }
    }

    /// Raw bytes of the whole dex file
    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    pub fn opcodes(&self) -> &Arc<Opcodes> {
        &self.opcodes
    }

    /// Parse the fixed header fields
    pub fn header(&self) -> Result<DexHeader, HeaderError> {
        DexHeader::parse(&self.buf)
    }
}

impl MultiDexFile for ZipDexFile {
    fn entry_name(&self) -> &str {
        &self.entry_name
    }

    fn container_id(&self) -> ContainerId {
        self.container
    }
}

impl fmt::Debug for ZipDexFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipDexFile")
            .field("entry_name", &self.entry_name)
            .field("len", &self.buf.len())
            .field("api", &self.opcodes.api())
            .field("container", &self.container)
            .finish()
    }
}
