//! Operating system version and the injectable probe

use serde::Serialize;
use std::fmt;
use std::process::Command;
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::version::MODERN_MAJOR;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Whether the per-display, per-space store is in use
    pub fn is_modern(&self) -> bool {
        self.major >= MODERN_MAJOR
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for OsVersion {
    type Err = Error;

    /// Accepts `14`, `14.2` and `14.2.1`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid =
            || Error::SystemVersionDetectionFailed(format!("invalid version string '{trimmed}'"));
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

/// Version probe, shared by every call of a facade instance
pub type VersionProbe = Arc<dyn Fn() -> Result<OsVersion> + Send + Sync>;

/// A probe that always reports `version`
pub fn fixed(version: OsVersion) -> VersionProbe {
    Arc::new(move || Ok(version))
}

/// Probe that asks `sw_vers` for the product version
pub fn sw_vers() -> VersionProbe {
    Arc::new(|| {
        let output = Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .map_err(|e| {
                Error::SystemVersionDetectionFailed(format!("failed to run sw_vers: {e}"))
            })?;
        if !output.status.success() {
            return Err(Error::SystemVersionDetectionFailed(format!(
                "sw_vers exited with {}",
                output.status
            )));
        }
        String::from_utf8_lossy(&output.stdout).parse()
    })
}
