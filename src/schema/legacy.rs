//! Pre-Sonoma scheme: one global entry per setting in flat preference domains

use std::path::Path;
use tracing::info;

use crate::codec::{ScreensaverKind, WallpaperStyle, file_url, module_name};
use crate::constants::legacy as keys;
use crate::error::{Error, Result};
use crate::prefs::PreferenceDomain;
use crate::schema::{ActiveScreensaver, ActiveWallpaper, Scope, Source};
use crate::tree::{Mapping, Node, within};

#[derive(Debug, Clone)]
pub struct LegacyStrategy {
    screensaver: PreferenceDomain,
    desktop: PreferenceDomain,
}

impl LegacyStrategy {
    pub fn new(preferences_dir: &Path) -> Self {
        Self {
            screensaver: PreferenceDomain::new(preferences_dir, keys::SCREENSAVER_DOMAIN),
            desktop: PreferenceDomain::new(preferences_dir, keys::DESKTOP_DOMAIN),
        }
    }

    /// There is only one entry, so every scope reads it
    pub fn screensaver(&self, _scope: &Scope) -> Result<Option<ActiveScreensaver>> {
        let prefs = self.screensaver.load()?;
        let Some(dict) = prefs.mapping(keys::MODULE_DICT)? else {
            return Ok(None);
        };
        let path = dict
            .string(keys::MODULE_PATH)
            .map_err(|e| within(keys::MODULE_DICT, e))?;
        let name = dict
            .string(keys::MODULE_NAME)
            .map_err(|e| within(keys::MODULE_DICT, e))?
            .map(str::to_string)
            .or_else(|| path.map(|p| module_name(Path::new(p))));
        let kind = dict
            .integer(keys::MODULE_TYPE)
            .map_err(|e| within(keys::MODULE_DICT, e))?
            .and_then(ScreensaverKind::from_code)
            .or_else(|| path.map(|p| ScreensaverKind::from_path(Path::new(p))))
            .unwrap_or(ScreensaverKind::Traditional);
        Ok(Some(ActiveScreensaver {
            name,
            kind,
            provider: None,
            source: Source::LegacyGlobal,
        }))
    }

    pub fn set_screensaver(
        &self,
        scope: &Scope,
        module: &Path,
        kind: ScreensaverKind,
    ) -> Result<usize> {
        require_global(scope)?;
        let is_builtin = module.as_os_str().is_empty();
        let name = match kind.builtin_name() {
            Some(name) if is_builtin => name.to_string(),
            _ => module_name(module),
        };
        let mut dict = Mapping::from_pairs([(keys::MODULE_NAME, Node::from(name))]);
        if !is_builtin {
            dict.insert(keys::MODULE_PATH, Node::from(module.display().to_string()));
        }
        dict.insert(keys::MODULE_TYPE, Node::int(kind.code()));
        self.screensaver.set(keys::MODULE_DICT, Node::Mapping(dict))?;
        info!(module = %module.display(), %kind, "Set global screen saver");
        Ok(1)
    }

    pub fn wallpaper(&self, _scope: &Scope) -> Result<Option<ActiveWallpaper>> {
        let prefs = self.desktop.load()?;
        let Some(entry) = prefs.mapping_at(&[keys::BACKGROUND, keys::BACKGROUND_DEFAULT])? else {
            return Ok(None);
        };
        let at = format!("{}.{}", keys::BACKGROUND, keys::BACKGROUND_DEFAULT);
        let url = entry
            .string(keys::IMAGE_FILE_PATH)
            .map_err(|e| within(&at, e))?
            .map(|p| file_url(Path::new(p)));
        let style = entry
            .string(keys::PLACEMENT)
            .map_err(|e| within(&at, e))?
            .and_then(|p| p.parse().ok());
        Ok(Some(ActiveWallpaper {
            url,
            style,
            source: Source::LegacyGlobal,
        }))
    }

    pub fn set_wallpaper(
        &self,
        scope: &Scope,
        image: &Path,
        style: WallpaperStyle,
    ) -> Result<usize> {
        require_global(scope)?;
        let image_path = std::path::absolute(image).unwrap_or_else(|_| image.to_path_buf());
        self.desktop.update(|prefs| {
            let entry = prefs.ensure_mapping(&[keys::BACKGROUND, keys::BACKGROUND_DEFAULT])?;
            entry.insert(keys::IMAGE_FILE_PATH, Node::from(image_path.display().to_string()));
            entry.insert(keys::PLACEMENT, Node::from(style.raw_value()));
            Ok(())
        })?;
        info!(image = %image_path.display(), %style, "Set global wallpaper");
        Ok(1)
    }
}

fn require_global(scope: &Scope) -> Result<()> {
    if scope.is_global() {
        Ok(())
    } else {
        Err(Error::ModernFeatureRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConfigStore;
    use tempfile::TempDir;

    #[test]
    fn test_screensaver_global_roundtrip() {
        let dir = TempDir::new().unwrap();
        let strategy = LegacyStrategy::new(dir.path());
        assert_eq!(strategy.screensaver(&Scope::Global).unwrap(), None);

        let module = Path::new("/Library/Screen Savers/Flurry.saver");
        let written = strategy
            .set_screensaver(&Scope::Global, module, ScreensaverKind::Traditional)
            .unwrap();
        assert_eq!(written, 1);

        let active = strategy.screensaver(&Scope::Global).unwrap().unwrap();
        assert_eq!(active.name.as_deref(), Some("Flurry"));
        assert_eq!(active.kind, ScreensaverKind::Traditional);
        assert_eq!(active.source, Source::LegacyGlobal);
    }

    #[test]
    fn test_builtin_is_stored_by_name_without_path() {
        let dir = TempDir::new().unwrap();
        let strategy = LegacyStrategy::new(dir.path());
        strategy
            .set_screensaver(&Scope::Global, Path::new(""), ScreensaverKind::BuiltInMac)
            .unwrap();

        let prefs = PreferenceDomain::new(dir.path(), keys::SCREENSAVER_DOMAIN).load().unwrap();
        let dict = prefs.mapping(keys::MODULE_DICT).unwrap().unwrap();
        assert_eq!(dict.string(keys::MODULE_NAME).unwrap(), Some("Macintosh"));
        assert!(dict.get(keys::MODULE_PATH).is_none());

        let active = strategy.screensaver(&Scope::Global).unwrap().unwrap();
        assert_eq!(active.name.as_deref(), Some("Macintosh"));
        assert_eq!(active.kind, ScreensaverKind::BuiltInMac);
    }

    #[test]
    fn test_per_space_write_is_rejected_and_file_untouched() {
        let dir = TempDir::new().unwrap();
        let strategy = LegacyStrategy::new(dir.path());
        strategy
            .set_screensaver(
                &Scope::Global,
                Path::new("/a/Flurry.saver"),
                ScreensaverKind::Traditional,
            )
            .unwrap();
        let file = dir.path().join("com.apple.screensaver.plist");
        let before = ConfigStore::checksum(&file).unwrap();

        let scopes = [
            Scope::Display("D1".into()),
            Scope::Space { space: "S1".into(), display: "D1".into() },
            Scope::SpaceDefault("S1".into()),
        ];
        for scope in &scopes {
            let err = strategy
                .set_screensaver(
                    scope,
                    Path::new("/a/Arabesque.saver"),
                    ScreensaverKind::Traditional,
                )
                .unwrap_err();
            assert!(matches!(err, Error::ModernFeatureRequired));
            assert!(matches!(
                strategy.set_wallpaper(scope, Path::new("/a/b.jpg"), WallpaperStyle::Fill),
                Err(Error::ModernFeatureRequired)
            ));
        }
        assert_eq!(ConfigStore::checksum(&file).unwrap(), before);
        assert!(!dir.path().join("com.apple.desktop.plist").exists());
    }

    #[test]
    fn test_wallpaper_merges_into_background() {
        let dir = TempDir::new().unwrap();
        let strategy = LegacyStrategy::new(dir.path());
        let desktop = PreferenceDomain::new(dir.path(), keys::DESKTOP_DOMAIN);
        desktop.set("Other", Node::from("kept")).unwrap();

        strategy
            .set_wallpaper(&Scope::Global, Path::new("/Pictures/sea.jpg"), WallpaperStyle::Center)
            .unwrap();

        let active = strategy.wallpaper(&Scope::Global).unwrap().unwrap();
        assert_eq!(active.url.as_deref(), Some("file:///Pictures/sea.jpg"));
        assert_eq!(active.style, Some(WallpaperStyle::Center));
        assert_eq!(desktop.load().unwrap().string("Other").unwrap(), Some("kept"));
    }

    #[test]
    fn test_kind_falls_back_to_path() {
        let dir = TempDir::new().unwrap();
        let prefs = PreferenceDomain::new(dir.path(), keys::SCREENSAVER_DOMAIN);
        prefs
            .set(
                keys::MODULE_DICT,
                Node::Mapping(Mapping::from_pairs([(
                    keys::MODULE_PATH,
                    Node::from("/x/Word.appex"),
                )])),
            )
            .unwrap();
        let active = LegacyStrategy::new(dir.path()).screensaver(&Scope::Global).unwrap().unwrap();
        assert_eq!(active.name.as_deref(), Some("Word"));
        assert_eq!(active.kind, ScreensaverKind::AppExtension);
    }

    #[test]
    fn test_mistyped_module_dict_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let prefs = PreferenceDomain::new(dir.path(), keys::SCREENSAVER_DOMAIN);
        prefs
            .set(
                keys::MODULE_DICT,
                Node::Mapping(Mapping::from_pairs([(keys::MODULE_TYPE, Node::from("zero"))])),
            )
            .unwrap();
        match LegacyStrategy::new(dir.path()).screensaver(&Scope::Global) {
            Err(Error::ParseError { path, .. }) => assert_eq!(path, "moduleDict.type"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
