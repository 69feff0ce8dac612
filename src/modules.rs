//! Installed screen saver modules

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::codec::{ScreensaverKind, module_name};
use crate::constants::paths::SYSTEM_ROOT;
use crate::error::{Error, Result};
use crate::tree::Node;

/// Bundle extensions recognized as screen saver modules
const MODULE_EXTENSIONS: [&str; 3] = ["saver", "qtz", "appex"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreensaverModuleDescriptor {
    pub name: String,
    pub identifier: String,
    pub path: PathBuf,
    pub kind: ScreensaverKind,
    pub is_system: bool,
    pub thumbnail: Option<PathBuf>,
}

impl ScreensaverModuleDescriptor {
    /// Descriptor for a bundle on disk
    pub fn from_bundle(path: &Path) -> Self {
        let name = module_name(path);
        let identifier = bundle_identifier(path).unwrap_or_else(|| name.clone());
        let thumbnail = path.join("Contents/Resources/thumbnail.png");
        Self {
            identifier,
            kind: ScreensaverKind::from_path(path),
            is_system: path.starts_with(SYSTEM_ROOT),
            thumbnail: thumbnail.exists().then_some(thumbnail),
            path: path.to_path_buf(),
            name,
        }
    }

    /// A screen saver with no bundle; its path is empty
    pub fn builtin(kind: ScreensaverKind) -> Option<Self> {
        let name = kind.builtin_name()?;
        Some(Self {
            name: name.to_string(),
            identifier: kind.provider().to_string(),
            path: PathBuf::new(),
            kind,
            is_system: true,
            thumbnail: None,
        })
    }

    pub fn is_builtin(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

/// Built-in screen savers, one per kind that has no bundle
pub fn builtin_modules() -> Vec<ScreensaverModuleDescriptor> {
    ScreensaverKind::ALL
        .into_iter()
        .filter_map(ScreensaverModuleDescriptor::builtin)
        .collect()
}

/// Source of installed modules
pub trait ModuleCatalog: Send + Sync {
    fn modules(&self) -> Result<Vec<ScreensaverModuleDescriptor>>;

    /// Case-insensitive lookup by module name
    fn find(&self, name: &str) -> Result<ScreensaverModuleDescriptor> {
        self.modules()?
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::ScreensaverNotFound(name.to_string()))
    }
}

impl ModuleCatalog for Vec<ScreensaverModuleDescriptor> {
    fn modules(&self) -> Result<Vec<ScreensaverModuleDescriptor>> {
        Ok(self.clone())
    }
}

/// Scans a list of directories (not recursively) for module bundles
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    dirs: Vec<PathBuf>,
}

impl DirectoryCatalog {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    fn scan(dir: &Path) -> Result<Vec<ScreensaverModuleDescriptor>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Module directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::from_read(dir, e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let is_module = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| MODULE_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)));
            if is_module {
                found.push(ScreensaverModuleDescriptor::from_bundle(&path));
            }
        }
        Ok(found)
    }
}

impl ModuleCatalog for DirectoryCatalog {
    /// Sorted by name; a name seen in an earlier directory shadows later ones,
    /// and any bundle shadows a built-in of the same name
    fn modules(&self) -> Result<Vec<ScreensaverModuleDescriptor>> {
        let mut seen = HashSet::new();
        let mut modules = Vec::new();
        for dir in &self.dirs {
            for module in Self::scan(dir)? {
                if seen.insert(module.name.to_lowercase()) {
                    modules.push(module);
                }
            }
        }
        for module in builtin_modules() {
            if seen.insert(module.name.to_lowercase()) {
                modules.push(module);
            }
        }
        modules.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        debug!(count = modules.len(), "Enumerated screen saver modules");
        Ok(modules)
    }
}

/// `CFBundleIdentifier` from `Contents/Info.plist`, if readable
fn bundle_identifier(bundle: &Path) -> Option<String> {
    let bytes = fs::read(bundle.join("Contents/Info.plist")).ok()?;
    match Node::from_bytes(&bytes) {
        Ok(Node::Mapping(info)) => info
            .string("CFBundleIdentifier")
            .ok()
            .flatten()
            .map(str::to_string),
        _ => {
            debug!(bundle = %bundle.display(), "Unreadable Info.plist");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Mapping;
    use tempfile::TempDir;

    fn bundle(dir: &Path, file: &str, identifier: Option<&str>) -> PathBuf {
        let path = dir.join(file);
        fs::create_dir_all(path.join("Contents/Resources")).unwrap();
        if let Some(id) = identifier {
            let info = Node::Mapping(Mapping::from_pairs([("CFBundleIdentifier", Node::from(id))]));
            fs::write(path.join("Contents/Info.plist"), info.to_binary().unwrap()).unwrap();
        }
        path
    }

    #[test]
    fn test_scan_filters_sorts_and_reads_identifiers() {
        let dir = TempDir::new().unwrap();
        bundle(dir.path(), "Flurry.saver", Some("com.apple.Flurry"));
        bundle(dir.path(), "Word of the Day.appex", None);
        bundle(dir.path(), "Arabesque.qtz", None);
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let modules: Vec<_> = DirectoryCatalog::new(vec![dir.path().to_path_buf()])
            .modules()
            .unwrap()
            .into_iter()
            .filter(|m| !m.is_builtin())
            .collect();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Arabesque", "Flurry", "Word of the Day"]);

        assert_eq!(modules[1].identifier, "com.apple.Flurry");
        assert_eq!(modules[2].identifier, "Word of the Day");
        assert_eq!(modules[2].kind, ScreensaverKind::AppExtension);
        assert!(!modules[0].is_system);
    }

    #[test]
    fn test_first_directory_shadows_later() {
        let user = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let mine = bundle(user.path(), "Flurry.saver", None);
        bundle(local.path(), "Flurry.saver", None);

        let catalog = DirectoryCatalog::new(vec![
            user.path().to_path_buf(),
            local.path().join("missing"),
            local.path().to_path_buf(),
        ]);
        let modules = catalog.modules().unwrap();
        let flurry: Vec<_> = modules.iter().filter(|m| m.name == "Flurry").collect();
        assert_eq!(flurry.len(), 1);
        assert_eq!(flurry[0].path, mine);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = bundle(dir.path(), "Flurry.saver", None);
        fs::write(path.join("Contents/Resources/thumbnail.png"), b"png").unwrap();
        let catalog = DirectoryCatalog::new(vec![dir.path().to_path_buf()]);

        let found = catalog.find("flurry").unwrap();
        assert_eq!(found.path, path);
        assert!(found.thumbnail.is_some());
        assert!(matches!(catalog.find("Nope"), Err(Error::ScreensaverNotFound(n)) if n == "Nope"));
    }

    #[test]
    fn test_builtins_are_listed_and_shadowable() {
        let dir = TempDir::new().unwrap();
        let catalog = DirectoryCatalog::new(vec![dir.path().to_path_buf()]);
        let names: Vec<_> = catalog.modules().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Aerial", "Default", "Macintosh"]);

        let mac = catalog.find("macintosh").unwrap();
        assert!(mac.is_builtin() && mac.is_system);
        assert_eq!(mac.kind, ScreensaverKind::BuiltInMac);
        assert_eq!(catalog.find("Default").unwrap().kind, ScreensaverKind::DefaultScreen);
        assert_eq!(catalog.find("aerial").unwrap().kind, ScreensaverKind::SequoiaVideo);

        let local = bundle(dir.path(), "Macintosh.saver", None);
        let mac = catalog.find("Macintosh").unwrap();
        assert_eq!(mac.path, local);
        assert_eq!(mac.kind, ScreensaverKind::Traditional);
    }

    #[test]
    fn test_system_flag() {
        let path = Path::new("/System/Library/Screen Savers/Flurry.saver");
        let module = ScreensaverModuleDescriptor::from_bundle(path);
        assert!(module.is_system);
        assert_eq!(module.kind, ScreensaverKind::Traditional);
    }
}
