//! Flat preference domains
//!
//! A domain is one property-list file `<dir>/<domain>.plist` holding a flat
//! mapping of keys. Used for the legacy screen saver and wallpaper keys and
//! for the idle timeout, which lives outside the modern store.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::store::ConfigStore;
use crate::tree::{Mapping, Node};

#[derive(Debug, Clone)]
pub struct PreferenceDomain {
    domain: String,
    store: ConfigStore,
}

impl PreferenceDomain {
    pub fn new(dir: &Path, domain: &str) -> Self {
        let path: PathBuf = dir.join(format!("{domain}.plist"));
        Self {
            domain: domain.to_string(),
            store: ConfigStore::new(path),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// All keys; a missing domain file reads as empty
    pub fn load(&self) -> Result<Mapping> {
        self.store.load_or_empty()
    }

    pub fn get(&self, key: &str) -> Result<Option<Node>> {
        Ok(self.load()?.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: Node) -> Result<()> {
        self.store.update(|prefs| {
            prefs.insert(key, value);
            Ok(())
        })?;
        info!(domain = %self.domain, key, "Wrote preference");
        Ok(())
    }

    /// Read-modify-write of the whole domain
    pub fn update<T>(&self, edit: impl FnOnce(&mut Mapping) -> Result<T>) -> Result<T> {
        self.store.update(edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_domain_reads_empty() {
        let dir = TempDir::new().unwrap();
        let prefs = PreferenceDomain::new(dir.path(), "com.apple.screensaver");
        assert!(prefs.load().unwrap().is_empty());
        assert_eq!(prefs.get("idleTime").unwrap(), None);
        assert_eq!(prefs.path(), dir.path().join("com.apple.screensaver.plist"));
    }

    #[test]
    fn test_set_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let prefs = PreferenceDomain::new(dir.path(), "com.apple.screensaver");
        prefs.set("askForPassword", Node::Bool(true)).unwrap();
        prefs.set("idleTime", Node::int(300)).unwrap();

        let all = prefs.load().unwrap();
        assert_eq!(all.boolean("askForPassword").unwrap(), Some(true));
        assert_eq!(all.integer("idleTime").unwrap(), Some(300));
    }
}
