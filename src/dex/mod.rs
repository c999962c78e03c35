//! Dalvik executable format: header classification and the shared format
//! configuration.
//!
//! Instruction decoding is not part of this crate; a loaded dex file is
//! handed out as raw bytes plus the [`Opcodes`] it should be read with.

mod header;
mod opcodes;

pub use header::{
    is_supported_dex_version, magic_version, sniff, verify_dex_header, DexHeader, HeaderError,
    HEADER_SIZE, SNIFF_LEN, SUPPORTED_DEX_VERSIONS,
};
pub use opcodes::{api_to_dex_version, dex_version_to_api, Opcodes, DEFAULT_API};
