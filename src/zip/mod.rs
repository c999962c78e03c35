//! ZIP archive reading.
//!
//! This module reads the entry table of a ZIP archive and opens byte streams
//! for individual entries, from any source that implements
//! [`ReadAt`](crate::io::ReadAt).
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Opening an archive and parsing its central directory
//! - [`stream`]: Bounded readers over a single entry's data
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first, then the Central Directory, so listing an
//! archive never touches entry data. Entry data is only read when a stream
//! for that entry is opened.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED and DEFLATE compression methods
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support

mod parser;
mod stream;
mod structures;

pub use parser::ZipArchive;
pub use stream::EntryReader;
pub use structures::*;
