use log::{debug, trace};
use std::path::PathBuf;
use std::sync::Arc;

use crate::dex::{self, Opcodes};
use crate::io::ArchiveSource;
use crate::zip::{ZipArchive, ZipFileEntry};
use crate::{Error, Result};

use super::{ContainerId, MultiDexContainer, ZipDexFile};

/// Tunables for a [`ZipDexContainer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Refuse to load entries whose declared uncompressed size exceeds this.
    /// `None` trusts the archive's declared size unconditionally.
    pub max_entry_size: Option<u64>,
}

/// A zip file that contains dex files, i.e. an APK or a JAR.
///
/// The container only remembers where the archive is. Every operation opens
/// the archive, does its work, and closes it again before returning, so a
/// container can be shared freely between threads.
///
/// ```no_run
/// use std::sync::Arc;
/// use zipdex::{MultiDexContainer, MultiDexFile, Opcodes, ZipDexContainer};
///
/// let container = ZipDexContainer::new("app.apk", Arc::new(Opcodes::for_api(28)));
/// for name in container.dex_entry_names()? {
///     if let Some(dex) = container.entry(&name)? {
///         println!("{}: {} bytes", dex.entry_name(), dex.buf().len());
///     }
/// }
/// # Ok::<(), zipdex::Error>(())
/// ```
pub struct ZipDexContainer<S: ArchiveSource = PathBuf> {
    source: S,
    opcodes: Arc<Opcodes>,
    options: ContainerOptions,
    id: ContainerId,
}

impl ZipDexContainer<PathBuf> {
    /// Container over the zip file at `path`
    pub fn new(path: impl Into<PathBuf>, opcodes: Arc<Opcodes>) -> Self {
        Self::with_source(path.into(), opcodes)
    }
}

impl<S: ArchiveSource> ZipDexContainer<S> {
    pub fn with_source(source: S, opcodes: Arc<Opcodes>) -> Self {
        Self {
            source,
            opcodes,
            options: ContainerOptions::default(),
            id: ContainerId::next(),
        }
    }

    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether the source can be opened and parsed as a zip archive.
    ///
    /// Never fails: an unreadable source and a non-zip source both yield
    /// `false`.
    pub fn is_zip_file(&self) -> bool {
        match self.open_archive() {
            Ok(_archive) => true,
            Err(e) => {
                debug!("{} is not a usable zip: {}", self.source.location(), e);
                false
            }
        }
    }

    /// Open the archive for the duration of one operation.
    ///
    /// The returned archive owns the reader; dropping it closes the handle.
    fn open_archive(&self) -> Result<ZipArchive<S::Reader>> {
        let reader = self.source.open()?;
        let archive = ZipArchive::new(reader).map_err(|e| match e {
            Error::NotAnArchive(reason) => {
                Error::NotAnArchive(format!("{}: {}", self.source.location(), reason))
            }
            other => other,
        })?;
        debug!(
            "Opened {} ({} entries)",
            self.source.location(),
            archive.entries().len()
        );
        Ok(archive)
    }

    /// Sniff the entry's header prefix. Any rejection is `false`; only
    /// failures to read the entry are errors.
    fn is_dex(&self, archive: &ZipArchive<S::Reader>, entry: &ZipFileEntry) -> Result<bool> {
        if entry.is_directory {
            debug!("Skipping directory {}", entry.file_name);
            return Ok(false);
        }

        trace!("Sniffing {}", entry.file_name);
        let mut stream = archive.open_entry(entry)?;
        match dex::sniff(&mut stream)? {
            Ok(_version) => Ok(true),
            Err(reason) => {
                debug!("Skipping {}: {}", entry.file_name, reason);
                Ok(false)
            }
        }
    }

    fn load_entry(
        &self,
        archive: &ZipArchive<S::Reader>,
        entry: &ZipFileEntry,
    ) -> Result<ZipDexFile> {
        if let Some(limit) = self.options.max_entry_size {
            if entry.uncompressed_size > limit {
                return Err(Error::EntryTooLarge {
                    entry: entry.file_name.clone(),
                    size: entry.uncompressed_size,
                    limit,
                });
            }
        }

        let buf = archive.read_entry(entry)?;
        dex::verify_dex_header(&buf).map_err(|reason| Error::NotADexFile {
            entry: entry.file_name.clone(),
            reason,
        })?;

        debug!("Loaded {} ({} bytes)", entry.file_name, buf.len());
        Ok(ZipDexFile::new(
            Arc::clone(&self.opcodes),
            buf,
            entry.file_name.clone(),
            self.id,
        ))
    }
}

impl<S: ArchiveSource> MultiDexContainer for ZipDexContainer<S> {
    type DexFile = ZipDexFile;

    fn opcodes(&self) -> &Arc<Opcodes> {
        &self.opcodes
    }

    /// Names of the entries whose header identifies a supported dex file.
    ///
    /// Entries that are not dex files, are malformed, or use an unsupported
    /// dex version are left out without error; apks mix dex files with all
    /// kinds of other content.
    fn dex_entry_names(&self) -> Result<Vec<String>> {
        let archive = self.open_archive()?;

        let mut entry_names = Vec::new();
        for entry in archive.entries() {
            if self.is_dex(&archive, entry)? {
                entry_names.push(entry.file_name.clone());
            }
        }

        Ok(entry_names)
    }

    /// Load a dex file from a specific named entry.
    ///
    /// # Errors
    ///
    /// Unlike listing, an entry that exists but is not a dex file fails
    /// with [`Error::NotADexFile`].
    fn entry(&self, entry_name: &str) -> Result<Option<ZipDexFile>> {
        let archive = self.open_archive()?;

        match archive.by_name(entry_name) {
            Some(entry) => self.load_entry(&archive, entry).map(Some),
            None => Ok(None),
        }
    }
}
