//! # zipdex
//!
//! Find and load the dex files packaged inside a zip archive, such as an
//! APK or a JAR.
//!
//! A [`ZipDexContainer`] remembers where an archive lives and which
//! [`Opcodes`] its dex files should be read with. Listing sniffs every
//! entry's header and returns the names of the entries that are dex files;
//! anything else in the archive (manifests, resources, native libraries) is
//! skipped quietly. Loading a named entry reads it fully into an immutable
//! [`ZipDexFile`].
//!
//! ## Features
//!
//! - Archives on the local filesystem, in memory, or on an HTTP server that
//!   supports Range requests
//! - ZIP64 archives, STORED and DEFLATE entries
//! - Header sniffing that never decompresses more than the first 44 bytes
//!   of an entry
//! - The archive is opened and closed inside every call; nothing is held
//!   open between calls
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipdex::{MultiDexContainer, MultiDexFile, Opcodes, ZipDexContainer};
//!
//! let container = ZipDexContainer::new("app.apk", Arc::new(Opcodes::for_api(28)));
//!
//! if container.is_zip_file() {
//!     for name in container.dex_entry_names()? {
//!         let dex = container.entry(&name)?.expect("listed entries exist");
//!         println!("{}: dex {:03}", dex.entry_name(), dex.header()?.version);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod container;
pub mod dex;
mod error;
pub mod io;
pub mod zip;

pub use container::{
    ContainerId, ContainerOptions, MultiDexContainer, MultiDexFile, ZipDexContainer, ZipDexFile,
};
pub use dex::{DexHeader, HeaderError, Opcodes};
pub use error::{Error, Result};
pub use io::{ArchiveSource, HttpSource, LocalFileReader, MemorySource, ReadAt};
