//! ZIP archive handle and central directory parser.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Steps 1-3 happen in [`ZipArchive::new`]; step 4 happens lazily per entry.

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::{Cursor, Read};

use crate::io::ReadAt;
use crate::{Error, Result};

use super::stream::EntryReader;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// An open ZIP archive.
///
/// Owns its reader; dropping the archive releases the underlying handle.
/// The central directory is parsed once, up front, so the entry list is
/// in the archive's own directory order.
pub struct ZipArchive<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Entries in central directory order
    entries: Vec<ZipFileEntry>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Parse the central directory of `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAnArchive`] if the bytes are not a ZIP archive,
    /// or [`Error::Io`] if the reader itself fails.
    pub fn new(reader: R) -> Result<Self> {
        let size = reader.size();
        let (eocd, eocd_offset) = find_eocd(&reader, size)?;

        // Get Central Directory info, using ZIP64 if needed
        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = read_zip64_eocd(&reader, size, eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset
            .checked_add(cd_size)
            .is_none_or(|end| end > eocd_offset)
        {
            return Err(Error::NotAnArchive(format!(
                "central directory ({} bytes at {}) runs past the end record at {}",
                cd_size, cd_offset, eocd_offset
            )));
        }

        // Read the entire Central Directory in one request
        let mut cd_data = vec![0u8; cd_size as usize];
        reader.read_exact_at(cd_offset, &mut cd_data)?;

        // A lying entry count must not drive the allocation
        let capacity = total_entries.min(cd_size / CDFH_MIN_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..total_entries {
            let entry = parse_cdfh(&mut cursor).map_err(|e| {
                Error::NotAnArchive(format!("central directory entry {}: {}", index, e))
            })?;
            entries.push(entry);
        }

        debug!("Parsed central directory: {} entries", entries.len());

        Ok(Self { reader, entries })
    }

    /// All entries, in central directory order
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Look up an entry by its exact, case-sensitive name
    pub fn by_name(&self, name: &str) -> Option<&ZipFileEntry> {
        self.entries.iter().find(|e| e.file_name == name)
    }

    /// Open a stream over the uncompressed content of `entry`.
    ///
    /// Only the compressed bytes of this entry are reachable from the
    /// returned reader, and nothing is read until the caller reads.
    pub fn open_entry(&self, entry: &ZipFileEntry) -> Result<EntryReader<'_, R>> {
        if entry.is_encrypted() {
            return Err(Error::UnsupportedEntry {
                entry: entry.file_name.clone(),
                reason: "encrypted entries are not supported".to_string(),
            });
        }
        if let CompressionMethod::Unknown(_) = entry.compression_method {
            return Err(Error::UnsupportedEntry {
                entry: entry.file_name.clone(),
                reason: format!(
                    "unsupported compression method: {}",
                    entry.compression_method.as_u16()
                ),
            });
        }

        let data_offset = self.data_offset(entry)?;
        Ok(EntryReader::new(
            &self.reader,
            entry.compression_method,
            data_offset,
            entry.compressed_size,
        ))
    }

    /// Read the whole entry into memory, trusting its declared size.
    ///
    /// The decompressed length and CRC-32 must match the central directory.
    pub fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        // Declared sizes can be forged; cap the up-front allocation
        const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

        let stream = self.open_entry(entry)?;
        let mut buf = Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOC) as usize);
        stream
            .take(entry.uncompressed_size.saturating_add(1))
            .read_to_end(&mut buf)?;

        if buf.len() as u64 != entry.uncompressed_size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "{}: size mismatch, expected {} bytes, got {}",
                    entry.file_name,
                    entry.uncompressed_size,
                    buf.len()
                ),
            )
            .into());
        }

        let mut crc = flate2::Crc::new();
        crc.update(&buf);
        if crc.sum() != entry.crc32 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "{}: CRC-32 mismatch, expected {:08x}, got {:08x}",
                    entry.file_name,
                    entry.crc32,
                    crc.sum()
                ),
            )
            .into());
        }

        Ok(buf)
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry, so
    /// the LFH is read to find where the data begins.
    fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf)?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: invalid local file header", entry.file_name),
            )
            .into());
        }

        // Read the variable field lengths from fixed positions in LFH
        let mut cursor = Cursor::new(&lfh_buf[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }
}

/// Find and parse the End of Central Directory record.
///
/// Handles both the simple case (no comment) and archives with comments
/// by searching backwards for the signature.
fn find_eocd<R: ReadAt>(reader: &R, size: u64) -> Result<(EndOfCentralDirectory, u64)> {
    let eocd_size = EndOfCentralDirectory::SIZE as u64;
    if size < eocd_size {
        return Err(Error::NotAnArchive(format!(
            "file is too short ({} bytes)",
            size
        )));
    }

    // Try the common case first: no comment, EOCD is the last 22 bytes
    let offset = size - eocd_size;
    let mut buf = [0u8; EndOfCentralDirectory::SIZE];
    reader.read_exact_at(offset, &mut buf)?;
    if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
        return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
    }

    // Search backwards from the end of the file through the comment window
    let search_size = (MAX_COMMENT_SIZE + eocd_size).min(size);
    let search_start = size - search_size;

    let mut buf = vec![0u8; search_size as usize];
    reader.read_exact_at(search_start, &mut buf)?;

    for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
        if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
            // The comment length field must account for the remaining bytes
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }
    }

    Err(Error::NotAnArchive(
        "end of central directory record not found".to_string(),
    ))
}

/// Read the ZIP64 End of Central Directory record via its locator, which
/// sits immediately before the regular EOCD.
fn read_zip64_eocd<R: ReadAt>(reader: &R, size: u64, eocd_offset: u64) -> Result<Zip64EOCD> {
    let locator_offset = eocd_offset
        .checked_sub(Zip64EOCDLocator::SIZE as u64)
        .ok_or_else(|| Error::NotAnArchive("missing ZIP64 locator".to_string()))?;
    let mut locator_buf = [0u8; Zip64EOCDLocator::SIZE];
    reader.read_exact_at(locator_offset, &mut locator_buf)?;

    let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

    if locator
        .eocd64_offset
        .checked_add(Zip64EOCD::MIN_SIZE as u64)
        .is_none_or(|end| end > size)
    {
        return Err(Error::NotAnArchive(
            "ZIP64 end of central directory out of bounds".to_string(),
        ));
    }

    let mut eocd64_buf = [0u8; Zip64EOCD::MIN_SIZE];
    reader.read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

    Zip64EOCD::from_bytes(&eocd64_buf)
}

/// Parse one Central Directory File Header from a cursor over the
/// in-memory directory.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> std::io::Result<ZipFileEntry> {
    let malformed = |msg: &str| std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string());

    // Read and verify the signature (PK\x01\x02)
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(malformed("bad signature"));
    }

    // Read fixed-size header fields
    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Lossy conversion keeps non-UTF8 names addressable by their rendering
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let is_directory = file_name.ends_with('/');

    let extra_field_end = cursor.position() + extra_field_length as u64;
    if extra_field_end + file_comment_length as u64 > cursor.get_ref().len() as u64 {
        return Err(malformed("header runs past the central directory"));
    }

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == 0x0001 {
            // ZIP64 extended information: each field is present only if the
            // corresponding header field is saturated
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }

        cursor.set_position(field_end);
    }

    // Skip over the extra field and the file comment
    cursor.set_position(extra_field_end + file_comment_length as u64);

    Ok(ZipFileEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        flags,
        is_directory,
    })
}
