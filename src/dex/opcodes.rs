/// API level used when nothing more specific is known
pub const DEFAULT_API: u32 = 20;

/// Format configuration shared by a container and every file it loads.
///
/// Identifies which Android API level (and therefore which dex version)
/// the bytes should be interpreted against. Build one, wrap it in an
/// `Arc`, and hand it to any number of containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcodes {
    api: u32,
}

impl Opcodes {
    pub fn for_api(api: u32) -> Self {
        Self { api }
    }

    /// Configuration for the newest API level that emits `dex_version`.
    ///
    /// Returns `None` for versions no API level produces.
    pub fn for_dex_version(dex_version: u32) -> Option<Self> {
        dex_version_to_api(dex_version).map(Self::for_api)
    }

    pub fn api(&self) -> u32 {
        self.api
    }

    /// Dex version emitted for this API level
    pub fn dex_version(&self) -> u32 {
        api_to_dex_version(self.api)
    }
}

impl Default for Opcodes {
    fn default() -> Self {
        Self::for_api(DEFAULT_API)
    }
}

pub fn api_to_dex_version(api: u32) -> u32 {
    match api {
        0..=23 => 35,
        24..=25 => 37,
        26..=27 => 38,
        _ => 39,
    }
}

pub fn dex_version_to_api(dex_version: u32) -> Option<u32> {
    match dex_version {
        35 => Some(23),
        37 => Some(25),
        38 => Some(27),
        39 => Some(28),
        _ => None,
    }
}
