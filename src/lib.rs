//! Read and write macOS screen saver and wallpaper settings
//!
//! On macOS 14 and later the settings live in a per-display, per-space binary
//! property-list store; earlier releases keep a single global entry in flat
//! preference domains. [`DesktopSettings`] hides which scheme is in use.

#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod constants;
pub mod displays;
pub mod error;
pub mod facade;
pub mod modules;
pub mod prefs;
pub mod schema;
pub mod spaces;
pub mod store;
pub mod tree;
pub mod version;

pub use codec::{ScreensaverKind, WallpaperStyle};
pub use displays::{
    DisplayDescriptor, DisplayEnumerator, DisplayGeometry, IndexedDisplays, ScreenIdentifier,
};
pub use error::{Error, Result};
pub use facade::{DesktopSettings, WallpaperOptions};
pub use modules::{DirectoryCatalog, ModuleCatalog, ScreensaverModuleDescriptor, builtin_modules};
pub use schema::{ActiveScreensaver, ActiveWallpaper, Scope, Source, StoreLocations};
pub use spaces::SpaceDescriptor;
pub use store::ConfigStore;
pub use version::OsVersion;
