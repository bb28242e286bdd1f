//! Platform detection
//!
//! Maps the host operating system and CPU architecture onto the closed set
//! of platforms dependency artifacts are published for.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::OnceLock;

/// Host platform tag used to select artifacts and the executable extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    /// Linux on x86_64
    LinuxX86_64,
    /// macOS (any architecture)
    MacOs,
    /// Windows
    Windows,
}

impl Platform {
    /// All known platforms
    pub const ALL: [Platform; 3] = [Platform::LinuxX86_64, Platform::MacOs, Platform::Windows];

    /// Match an OS name and architecture as reported by `std::env::consts`
    pub fn from_os_arch(os: &str, arch: &str) -> Option<Self> {
        match (os, arch) {
            ("linux", "x86_64") => Some(Self::LinuxX86_64),
            ("macos", _) => Some(Self::MacOs),
            ("windows", _) => Some(Self::Windows),
            _ => None,
        }
    }

    /// Detect the current platform
    pub fn detect() -> Result<Self> {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;

        Self::from_os_arch(os, arch).ok_or_else(|| Error::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }

    /// Stable tag, e.g. `linux-x86_64`
    pub fn tag(&self) -> &'static str {
        match self {
            Self::LinuxX86_64 => "linux-x86_64",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        }
    }

    /// Suffix appended to executable names
    pub fn executable_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::LinuxX86_64 | Self::MacOs => "",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Current platform, detected once per process
pub fn current_platform() -> Result<Platform> {
    static DETECTED: OnceLock<Option<Platform>> = OnceLock::new();

    match DETECTED.get_or_init(|| Platform::detect().ok()) {
        Some(platform) => Ok(*platform),
        None => Platform::detect(),
    }
}
