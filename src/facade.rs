//! Public entry point
//!
//! [`DesktopSettings`] is built with explicit store locations, a version
//! probe, a display enumerator and a module catalog, so every collaborator can
//! be replaced in tests. Each call selects the schema strategy afresh and runs
//! its read-modify-write cycle to completion before returning.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::codec::WallpaperStyle;
use crate::constants::legacy::{IDLE_TIME, SCREENSAVER_DOMAIN};
use crate::displays::{DisplayDescriptor, DisplayEnumerator, ScreenIdentifier};
use crate::error::{Error, Result};
use crate::modules::{ModuleCatalog, ScreensaverModuleDescriptor};
use crate::prefs::PreferenceDomain;
use crate::schema::{ActiveScreensaver, ActiveWallpaper, SchemaStrategy, Scope, StoreLocations};
use crate::spaces::{SpaceDescriptor, SpaceIndex};
use crate::store::ConfigStore;
use crate::tree::Node;
use crate::version::{OsVersion, VersionProbe};

/// Wallpaper write options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallpaperOptions {
    pub style: WallpaperStyle,
}

#[derive(Clone)]
pub struct DesktopSettings {
    locations: StoreLocations,
    probe: VersionProbe,
    displays: Arc<dyn DisplayEnumerator>,
    catalog: Arc<dyn ModuleCatalog>,
}

impl DesktopSettings {
    pub fn new(
        locations: StoreLocations,
        probe: VersionProbe,
        displays: impl DisplayEnumerator + 'static,
        catalog: impl ModuleCatalog + 'static,
    ) -> Self {
        Self {
            locations,
            probe,
            displays: Arc::new(displays),
            catalog: Arc::new(catalog),
        }
    }

    pub fn locations(&self) -> &StoreLocations {
        &self.locations
    }

    pub fn os_version(&self) -> Result<OsVersion> {
        (self.probe)()
    }

    pub fn strategy(&self) -> Result<SchemaStrategy> {
        SchemaStrategy::select(self.os_version()?, &self.locations, self.displays.as_ref())
    }

    pub fn list_screensavers(&self) -> Result<Vec<ScreensaverModuleDescriptor>> {
        self.catalog.modules()
    }

    pub fn find_screensaver(&self, name: &str) -> Result<ScreensaverModuleDescriptor> {
        self.catalog.find(name)
    }

    /// `None` when nothing is configured for the scope
    pub fn screensaver(&self, scope: &Scope) -> Result<Option<ActiveScreensaver>> {
        self.strategy()?.screensaver(scope)
    }

    /// Set an installed module by name; returns the number of entries written
    pub fn set_screensaver(&self, scope: &Scope, name: &str) -> Result<usize> {
        let module = self.find_screensaver(name)?;
        self.set_screensaver_module(scope, &module)
    }

    pub fn set_screensaver_module(
        &self,
        scope: &Scope,
        module: &ScreensaverModuleDescriptor,
    ) -> Result<usize> {
        self.strategy()?.set_screensaver(scope, &module.path, module.kind)
    }

    /// Every display and space at once
    pub fn set_screensaver_everywhere(&self, name: &str) -> Result<usize> {
        self.set_screensaver(&Scope::Global, name)
    }

    pub fn wallpaper(&self, scope: &Scope) -> Result<Option<ActiveWallpaper>> {
        self.strategy()?.wallpaper(scope)
    }

    pub fn set_wallpaper(
        &self,
        scope: &Scope,
        image: &Path,
        options: WallpaperOptions,
    ) -> Result<usize> {
        if !image.exists() {
            return Err(Error::NotFound(image.to_path_buf()));
        }
        self.strategy()?.set_wallpaper(scope, image, options.style)
    }

    fn screensaver_prefs(&self) -> PreferenceDomain {
        PreferenceDomain::new(&self.locations.preferences_dir, SCREENSAVER_DOMAIN)
    }

    /// Seconds of inactivity before the screen saver starts; 0 means never
    pub fn idle_time(&self) -> Result<Option<u32>> {
        let prefs = self.screensaver_prefs().load()?;
        match prefs.integer(IDLE_TIME)? {
            None => Ok(None),
            Some(secs) => u32::try_from(secs)
                .map(Some)
                .map_err(|_| Error::parse(IDLE_TIME, format!("out of range: {secs}"))),
        }
    }

    pub fn set_idle_time(&self, seconds: u32) -> Result<()> {
        self.screensaver_prefs().set(IDLE_TIME, Node::int(i64::from(seconds)))?;
        info!(seconds, "Set idle time");
        Ok(())
    }

    pub fn displays(&self) -> Result<Vec<DisplayDescriptor>> {
        self.displays.displays()
    }

    pub fn spaces(&self) -> Result<Vec<SpaceDescriptor>> {
        let mut index = SpaceIndex::load(&self.locations.spaces)?;
        index.correlate(&self.displays()?);
        Ok(index.spaces().to_vec())
    }

    pub fn display_for_screen(&self, screen: ScreenIdentifier) -> Result<String> {
        self.displays()?
            .into_iter()
            .find(|d| d.screen == Some(screen))
            .map(|d| d.uuid)
            .ok_or(Error::InvalidScreenIdentifier(screen.0))
    }

    fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.locations.store)
    }

    pub fn backup(&self) -> Result<PathBuf> {
        self.store().backup()
    }

    pub fn restore(&self, backup: &Path) -> Result<()> {
        ConfigStore::restore(backup, &self.locations.store)
    }

    pub fn checksum(&self) -> Result<String> {
        ConfigStore::checksum(&self.locations.store)
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(DesktopSettings) -> Result<T> + Send + 'static,
    {
        let settings = self.clone();
        tokio::task::spawn_blocking(move || op(settings))
            .await
            .map_err(|e| Error::UnknownError(Box::new(e)))?
    }

    pub async fn set_screensaver_async(&self, scope: Scope, name: String) -> Result<usize> {
        self.blocking(move |s| s.set_screensaver(&scope, &name)).await
    }

    pub async fn set_wallpaper_async(
        &self,
        scope: Scope,
        image: PathBuf,
        options: WallpaperOptions,
    ) -> Result<usize> {
        self.blocking(move |s| s.set_wallpaper(&scope, &image, options)).await
    }

    pub async fn set_idle_time_async(&self, seconds: u32) -> Result<()> {
        self.blocking(move |s| s.set_idle_time(seconds)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ScreensaverKind;
    use crate::schema::Source;
    use crate::spaces::tests::{monitor, space, spaces_root};
    use crate::version;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        settings: DesktopSettings,
    }

    impl Fixture {
        fn store_path(&self) -> PathBuf {
            self.dir.path().join("Store/Index.plist")
        }
    }

    fn module(name: &str) -> ScreensaverModuleDescriptor {
        let path = format!("/Library/Screen Savers/{name}.saver");
        ScreensaverModuleDescriptor::from_bundle(Path::new(&path))
    }

    fn fixture(os: OsVersion) -> Fixture {
        let dir = TempDir::new().unwrap();
        let locations = StoreLocations {
            store: dir.path().join("Store/Index.plist"),
            spaces: dir.path().join("com.apple.spaces.plist"),
            preferences_dir: dir.path().join("Preferences"),
        };
        let root = spaces_root(vec![
            monitor("D1", "S1", vec![space("S1", 1), space("S2", 2)]),
            monitor("D2", "S3", vec![space("S3", 3)]),
        ]);
        fs::write(&locations.spaces, Node::Mapping(root).to_binary().unwrap()).unwrap();

        let displays = vec![
            DisplayDescriptor::new("D1").main().with_screen(69733382),
            DisplayDescriptor::new("D2").with_screen(2),
        ];
        let catalog = vec![module("Flurry"), module("Arabesque")];
        let settings = DesktopSettings::new(locations, version::fixed(os), displays, catalog);
        Fixture { dir, settings }
    }

    #[test]
    fn test_legacy_rejects_space_scope_and_leaves_file() {
        let fx = fixture(OsVersion::new(10, 15, 0));
        fx.settings.set_screensaver(&Scope::Global, "Flurry").unwrap();
        let prefs = fx.dir.path().join("Preferences/com.apple.screensaver.plist");
        let before = fs::read(&prefs).unwrap();

        let scope = Scope::Space {
            space: "S1".into(),
            display: "D1".into(),
        };
        assert!(matches!(
            fx.settings.set_screensaver(&scope, "Arabesque"),
            Err(Error::ModernFeatureRequired)
        ));
        assert_eq!(fs::read(&prefs).unwrap(), before);
        assert!(!fx.store_path().exists());
    }

    #[test]
    fn test_everywhere_on_two_displays_three_spaces() {
        let fx = fixture(OsVersion::new(14, 2, 1));
        assert_eq!(fx.settings.set_screensaver_everywhere("flurry").unwrap(), 6);

        for (space, display) in [("S1", "D1"), ("S2", "D1"), ("S3", "D2")] {
            let scope = Scope::Space {
                space: space.into(),
                display: display.into(),
            };
            let active = fx.settings.screensaver(&scope).unwrap().unwrap();
            assert_eq!(active.name.as_deref(), Some("Flurry"));
        }
        let active = fx.settings.screensaver(&Scope::Global).unwrap().unwrap();
        assert_eq!(active.name.as_deref(), Some("Flurry"));
        assert_eq!(active.kind, ScreensaverKind::Traditional);
        assert_eq!(active.source, Source::SpaceDisplay);
    }

    #[test]
    fn test_builtin_screensaver_everywhere() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        let mac = ScreensaverModuleDescriptor::builtin(ScreensaverKind::BuiltInMac).unwrap();
        assert_eq!(fx.settings.set_screensaver_module(&Scope::Global, &mac).unwrap(), 6);

        let active = fx.settings.screensaver(&Scope::Global).unwrap().unwrap();
        assert_eq!(active.name.as_deref(), Some("Macintosh"));
        assert_eq!(active.kind, ScreensaverKind::BuiltInMac);
        assert_eq!(active.provider.as_deref(), Some("com.apple.wallpaper.choice.macintosh"));
    }

    #[test]
    fn test_unknown_module_is_screensaver_not_found() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        assert!(matches!(
            fx.settings.set_screensaver(&Scope::Global, "Nope"),
            Err(Error::ScreensaverNotFound(_))
        ));
        assert!(!fx.store_path().exists());
    }

    #[test]
    fn test_version_probe_failure_aborts() {
        let mut fx = fixture(OsVersion::new(14, 0, 0));
        fx.settings.probe =
            Arc::new(|| Err(Error::SystemVersionDetectionFailed("no sw_vers".into())));
        assert!(matches!(
            fx.settings.set_screensaver(&Scope::Global, "Flurry"),
            Err(Error::SystemVersionDetectionFailed(_))
        ));
        assert!(!fx.store_path().exists());
    }

    #[test]
    fn test_wallpaper_requires_existing_image() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        let missing = fx.dir.path().join("missing.jpg");
        assert!(matches!(
            fx.settings.set_wallpaper(&Scope::Global, &missing, WallpaperOptions::default()),
            Err(Error::NotFound(p)) if p == missing
        ));

        let image = fx.dir.path().join("sea.jpg");
        fs::write(&image, b"jpeg").unwrap();
        let options = WallpaperOptions {
            style: WallpaperStyle::Fit,
        };
        let scope = Scope::Display("D2".into());
        assert_eq!(fx.settings.set_wallpaper(&scope, &image, options).unwrap(), 1);
        let active = fx.settings.wallpaper(&Scope::Display("D2".into())).unwrap().unwrap();
        assert_eq!(active.style, Some(WallpaperStyle::Fit));
        assert!(active.url.unwrap().ends_with("/sea.jpg"));
    }

    #[test]
    fn test_idle_time_roundtrip() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        assert_eq!(fx.settings.idle_time().unwrap(), None);
        fx.settings.set_idle_time(600).unwrap();
        assert_eq!(fx.settings.idle_time().unwrap(), Some(600));
        fx.settings.set_idle_time(0).unwrap();
        assert_eq!(fx.settings.idle_time().unwrap(), Some(0));
    }

    #[test]
    fn test_negative_idle_time_is_parse_error() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        PreferenceDomain::new(&fx.settings.locations().preferences_dir, SCREENSAVER_DOMAIN)
            .set(IDLE_TIME, Node::int(-5))
            .unwrap();
        assert!(matches!(fx.settings.idle_time(), Err(Error::ParseError { .. })));
    }

    #[test]
    fn test_spaces_and_screens() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        let spaces = fx.settings.spaces().unwrap();
        let uuids: Vec<_> = spaces.iter().map(|s| s.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["S1", "S2", "S3"]);
        assert!(spaces[0].is_current);

        assert_eq!(fx.settings.display_for_screen(ScreenIdentifier(2)).unwrap(), "D2");
        assert!(matches!(
            fx.settings.display_for_screen(ScreenIdentifier(7)),
            Err(Error::InvalidScreenIdentifier(7))
        ));
    }

    #[test]
    fn test_backup_write_restore() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        fx.settings.set_screensaver(&Scope::Display("D1".into()), "Flurry").unwrap();
        let original = fs::read(fx.store_path()).unwrap();
        let checksum = fx.settings.checksum().unwrap();

        fx.settings.set_screensaver(&Scope::Display("D1".into()), "Arabesque").unwrap();
        assert_ne!(fx.settings.checksum().unwrap(), checksum);

        let backup = fx.dir.path().join("Store/Index.plist.backup");
        fx.settings.restore(&backup).unwrap();
        assert_eq!(fs::read(fx.store_path()).unwrap(), original);
        assert_eq!(fx.settings.checksum().unwrap(), checksum);
        assert_eq!(fx.settings.backup().unwrap(), backup);
    }

    #[tokio::test]
    async fn test_async_entry_points() {
        let fx = fixture(OsVersion::new(14, 0, 0));
        let written = fx
            .settings
            .set_screensaver_async(Scope::Display("D2".into()), "Arabesque".into())
            .await
            .unwrap();
        assert_eq!(written, 1);
        fx.settings.set_idle_time_async(120).await.unwrap();
        assert_eq!(fx.settings.idle_time().unwrap(), Some(120));

        let active = fx.settings.screensaver(&Scope::Display("D2".into())).unwrap().unwrap();
        assert_eq!(active.name.as_deref(), Some("Arabesque"));
    }
}
