//! Storage schema strategies
//!
//! Which scheme holds the screen saver and wallpaper settings is decided once
//! per facade call from the OS major version: the flat legacy preference keys
//! before 14, the per-display, per-space store from 14 on.

pub mod entry;
pub mod legacy;
pub mod modern;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::codec::{ScreensaverKind, WallpaperStyle};
use crate::displays::DisplayEnumerator;
use crate::error::Result;
use crate::spaces::SpaceIndex;
use crate::store::ConfigStore;
use crate::version::OsVersion;

pub use legacy::LegacyStrategy;
pub use modern::ModernStrategy;

/// Where a setting is read from or written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Reads resolve the main display's current space; writes go everywhere
    Global,
    /// A display UUID
    Display(String),
    /// One space as shown on one display
    Space { space: String, display: String },
    /// A space's entry shared by every display
    SpaceDefault(String),
}

impl Scope {
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Display(d) => write!(f, "display {d}"),
            Scope::Space { space, display } => write!(f, "space {space} on display {display}"),
            Scope::SpaceDefault(s) => write!(f, "space {s} (all displays)"),
        }
    }
}

/// Tree level a read was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    SpaceDisplay,
    SpaceDefault,
    Display,
    LegacyGlobal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveScreensaver {
    pub name: Option<String>,
    pub kind: ScreensaverKind,
    pub provider: Option<String>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWallpaper {
    /// `file://` URL of the image
    pub url: Option<String>,
    pub style: Option<WallpaperStyle>,
    pub source: Source,
}

/// Files the strategies work on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocations {
    pub store: PathBuf,
    pub spaces: PathBuf,
    pub preferences_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub enum SchemaStrategy {
    Legacy(LegacyStrategy),
    Modern(ModernStrategy),
}

impl SchemaStrategy {
    /// Pick the scheme for `version`. The modern strategy snapshots the space
    /// index and the attached displays.
    pub fn select(
        version: OsVersion,
        locations: &StoreLocations,
        displays: &dyn DisplayEnumerator,
    ) -> Result<Self> {
        if !version.is_modern() {
            info!(%version, "Using legacy preference keys");
            return Ok(SchemaStrategy::Legacy(LegacyStrategy::new(&locations.preferences_dir)));
        }
        let displays = displays.displays()?;
        let index = SpaceIndex::load(&locations.spaces)?;
        info!(
            %version,
            displays = displays.len(),
            spaces = index.spaces().len(),
            "Using per-space store"
        );
        Ok(SchemaStrategy::Modern(ModernStrategy::new(
            ConfigStore::new(&locations.store),
            index,
            displays,
        )))
    }

    pub fn is_modern(&self) -> bool {
        matches!(self, SchemaStrategy::Modern(_))
    }

    pub fn screensaver(&self, scope: &Scope) -> Result<Option<ActiveScreensaver>> {
        match self {
            SchemaStrategy::Legacy(s) => s.screensaver(scope),
            SchemaStrategy::Modern(s) => s.screensaver(scope),
        }
    }

    /// Returns how many entries were written
    pub fn set_screensaver(
        &self,
        scope: &Scope,
        module: &Path,
        kind: ScreensaverKind,
    ) -> Result<usize> {
        match self {
            SchemaStrategy::Legacy(s) => s.set_screensaver(scope, module, kind),
            SchemaStrategy::Modern(s) => s.set_screensaver(scope, module, kind),
        }
    }

    pub fn wallpaper(&self, scope: &Scope) -> Result<Option<ActiveWallpaper>> {
        match self {
            SchemaStrategy::Legacy(s) => s.wallpaper(scope),
            SchemaStrategy::Modern(s) => s.wallpaper(scope),
        }
    }

    pub fn set_wallpaper(
        &self,
        scope: &Scope,
        image: &Path,
        style: WallpaperStyle,
    ) -> Result<usize> {
        match self {
            SchemaStrategy::Legacy(s) => s.set_wallpaper(scope, image, style),
            SchemaStrategy::Modern(s) => s.set_wallpaper(scope, image, style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::displays::DisplayDescriptor;
    use tempfile::TempDir;

    fn locations(dir: &TempDir) -> StoreLocations {
        StoreLocations {
            store: dir.path().join("Index.plist"),
            spaces: dir.path().join("com.apple.spaces.plist"),
            preferences_dir: dir.path().join("prefs"),
        }
    }

    #[test]
    fn test_select_by_major_version() {
        let dir = TempDir::new().unwrap();
        let displays = vec![DisplayDescriptor::new("D1").main()];

        let legacy =
            SchemaStrategy::select(OsVersion::new(13, 6, 0), &locations(&dir), &displays).unwrap();
        assert!(!legacy.is_modern());

        let modern =
            SchemaStrategy::select(OsVersion::new(14, 0, 0), &locations(&dir), &displays).unwrap();
        assert!(modern.is_modern());
    }

    #[test]
    fn test_scope_display() {
        let scope = Scope::Space {
            space: "S1".into(),
            display: "D1".into(),
        };
        assert_eq!(scope.to_string(), "space S1 on display D1");
        assert!(Scope::Global.is_global());
    }
}
