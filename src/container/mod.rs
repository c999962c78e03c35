//! Containers that package one or more dex files.

mod file;
mod zip_container;

pub use file::ZipDexFile;
pub use zip_container::{ContainerOptions, ZipDexContainer};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dex::Opcodes;
use crate::Result;

/// Process-unique identity of a container instance.
///
/// Files loaded from a container record this instead of a pointer to it, so
/// a file never keeps its container alive and never lives inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContainerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A set of dex files packaged together, each addressed by entry name.
pub trait MultiDexContainer {
    type DexFile: MultiDexFile;

    /// The format configuration shared with every file this container loads
    fn opcodes(&self) -> &Arc<Opcodes>;

    /// Names of the entries that hold dex files, in container order
    fn dex_entry_names(&self) -> Result<Vec<String>>;

    /// Load the named entry, or `None` if there is no such entry
    fn entry(&self, entry_name: &str) -> Result<Option<Self::DexFile>>;
}

/// A dex file that was loaded out of a [`MultiDexContainer`].
pub trait MultiDexFile {
    fn entry_name(&self) -> &str;

    /// Identity of the container that produced this file
    fn container_id(&self) -> ContainerId;
}
