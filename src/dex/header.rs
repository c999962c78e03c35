//! Dex header sniffing and parsing.
//!
//! A dex file starts with a fixed 0x70-byte header. Only the first 44 bytes
//! (magic, checksum, signature, file size, header size and endian tag) are
//! needed to decide whether a byte stream is a dex file this crate can
//! handle, so sniffing never reads past that prefix.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use thiserror::Error;

/// Bytes needed to classify a stream
pub const SNIFF_LEN: usize = 44;

/// Size of the complete header item
pub const HEADER_SIZE: usize = 0x70;

pub const MAGIC_PREFIX: &[u8] = b"dex\n";
pub const ENDIAN_TAG_OFFSET: usize = 40;
pub const LITTLE_ENDIAN_TAG: u32 = 0x12345678;
pub const BIG_ENDIAN_TAG: u32 = 0x78563412;

/// Dex versions this crate accepts.
pub const SUPPORTED_DEX_VERSIONS: &[u32] = &[35, 37, 38, 39];

/// Why a byte stream was rejected as a dex file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Does not carry the dex magic at all.
    #[error("not a dex file: {0}")]
    NotDex(String),

    /// Has the magic, but the header is malformed.
    #[error("invalid dex file: {0}")]
    Invalid(String),

    /// Well-formed, but a version or byte order we can't read.
    #[error("unsupported dex file: {0}")]
    Unsupported(String),
}

/// Parse the version out of the 8-byte magic, `dex\nNNN\0`.
///
/// Returns `None` if the magic does not match.
pub fn magic_version(buf: &[u8]) -> Option<u32> {
    if buf.len() < 8 || &buf[0..4] != MAGIC_PREFIX || buf[7] != 0 {
        return None;
    }

    let digits = &buf[4..7];
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(digits.iter().fold(0, |acc, d| acc * 10 + (d - b'0') as u32))
}

pub fn is_supported_dex_version(version: u32) -> bool {
    SUPPORTED_DEX_VERSIONS.contains(&version)
}

/// Verify the header prefix held in `buf`, returning the dex version.
pub fn verify_dex_header(buf: &[u8]) -> Result<u32, HeaderError> {
    if buf.len() < SNIFF_LEN {
        return Err(HeaderError::NotDex("file is too short".to_string()));
    }

    let version = magic_version(buf).ok_or_else(|| {
        let magic: Vec<String> = buf[..8].iter().map(|b| format!("{:02x}", b)).collect();
        HeaderError::NotDex(format!("not a valid dex magic value: {}", magic.join(" ")))
    })?;

    if !is_supported_dex_version(version) {
        return Err(HeaderError::Unsupported(format!(
            "dex version {:03} is not supported",
            version
        )));
    }

    let endian = u32::from_le_bytes([
        buf[ENDIAN_TAG_OFFSET],
        buf[ENDIAN_TAG_OFFSET + 1],
        buf[ENDIAN_TAG_OFFSET + 2],
        buf[ENDIAN_TAG_OFFSET + 3],
    ]);
    match endian {
        LITTLE_ENDIAN_TAG => Ok(version),
        BIG_ENDIAN_TAG => Err(HeaderError::Unsupported(
            "big endian dex files are not supported".to_string(),
        )),
        other => Err(HeaderError::Invalid(format!(
            "invalid endian tag: {:#x}",
            other
        ))),
    }
}

/// Read at most [`SNIFF_LEN`] bytes from `reader` and classify them.
///
/// The outer `io::Result` carries failures of the reader itself; the inner
/// result is the verdict on the bytes.
pub fn sniff<R: Read>(reader: &mut R) -> io::Result<Result<u32, HeaderError>> {
    let mut prefix = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(verify_dex_header(&prefix[..filled]))
}

/// The fixed fields of a dex header item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexHeader {
    pub version: u32,
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl DexHeader {
    /// Parse the header item from the start of a whole dex file.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        let version = verify_dex_header(buf)?;
        if buf.len() < HEADER_SIZE {
            return Err(HeaderError::Invalid(format!(
                "header item truncated: {} of {} bytes",
                buf.len(),
                HEADER_SIZE
            )));
        }

        // Length is checked above, the reads can't run short
        Self::read_fields(version, &buf[..HEADER_SIZE])
            .map_err(|e| HeaderError::Invalid(e.to_string()))
    }

    fn read_fields(version: u32, buf: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(&buf[8..]);
        let checksum = cursor.read_u32::<LittleEndian>()?;
        let mut signature = [0u8; 20];
        cursor.read_exact(&mut signature)?;
        let mut next = || cursor.read_u32::<LittleEndian>();

        Ok(Self {
            version,
            checksum,
            signature,
            file_size: next()?,
            header_size: next()?,
            endian_tag: next()?,
            link_size: next()?,
            link_off: next()?,
            map_off: next()?,
            string_ids_size: next()?,
            string_ids_off: next()?,
            type_ids_size: next()?,
            type_ids_off: next()?,
            proto_ids_size: next()?,
            proto_ids_off: next()?,
            field_ids_size: next()?,
            field_ids_off: next()?,
            method_ids_size: next()?,
            method_ids_off: next()?,
            class_defs_size: next()?,
            class_defs_off: next()?,
            data_size: next()?,
            data_off: next()?,
        })
    }
}
