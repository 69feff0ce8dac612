use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::constants::{config, paths, version::OVERRIDE_ENV};
use crate::displays::DisplayDescriptor;
use crate::schema::StoreLocations;
use crate::version::{self, OsVersion, VersionProbe};

/// User settings loaded from `config.toml`
/// Every key is optional; environment variables override the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_spaces_path")]
    pub spaces_path: PathBuf,
    #[serde(default = "default_preferences_dir")]
    pub preferences_dir: PathBuf,
    #[serde(default = "default_module_dirs")]
    pub module_dirs: Vec<PathBuf>,
    /// Display UUIDs, main display first. When empty the displays are taken
    /// from the space index, where a lone display is only known as `Main`.
    #[serde(default)]
    pub displays: Vec<String>,
    /// Skip detection and pretend to run on this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_store_path() -> PathBuf {
    home().join(paths::STORE)
}

fn default_spaces_path() -> PathBuf {
    home().join(paths::SPACES)
}

fn default_preferences_dir() -> PathBuf {
    home().join(paths::PREFERENCES_DIR)
}

fn default_module_dirs() -> Vec<PathBuf> {
    vec![
        home().join(paths::USER_SCREEN_SAVERS),
        PathBuf::from(paths::LOCAL_SCREEN_SAVERS),
        PathBuf::from(paths::SYSTEM_SCREEN_SAVERS),
        PathBuf::from(paths::SYSTEM_EXTENSIONS),
    ]
}

fn default_log_level() -> String {
    config::DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            spaces_path: default_spaces_path(),
            preferences_dir: default_preferences_dir(),
            module_dirs: default_module_dirs(),
            displays: Vec::new(),
            os_version: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Settings file to read, and whether it has yet to be generated
    pub fn locate(explicit: Option<&Path>) -> (PathBuf, bool) {
        match explicit {
            Some(path) => (path.to_path_buf(), false),
            None => {
                let path = Self::config_path();
                let first_run = !path.exists();
                (path, first_run)
            }
        }
    }

    /// Parse `path` and apply env overrides. Nothing is logged, so this can
    /// run before a subscriber is installed.
    pub fn read(path: &Path) -> Result<Self> {
        let mut settings = Self::load_from(path)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Write a default file on first run, then validate
    pub fn finish(&mut self, path: &Path, first_run: bool) -> Result<()> {
        if first_run {
            if let Err(e) = Self::default().save_to(path) {
                error!(error = ?e, "Failed to save config");
            } else {
                info!(
                    path = %path.display(),
                    "Generated config file for user to edit (env vars still override)"
                );
            }
        }
        self.validate()
    }

    /// Parse `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .context(format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context(format!("Failed to read config file {}", path.display())),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, contents)
            .context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(store) = lookup(config::STORE_ENV) {
            self.store_path = PathBuf::from(store);
        }
        if let Some(spaces) = lookup(config::SPACES_ENV) {
            self.spaces_path = PathBuf::from(spaces);
        }
        if let Some(dir) = lookup(config::PREFS_DIR_ENV) {
            self.preferences_dir = PathBuf::from(dir);
        }
        if let Some(version) = lookup(OVERRIDE_ENV) {
            self.os_version = Some(version);
        }
        if let Some(displays) = lookup(config::DISPLAYS_ENV) {
            self.displays = displays.split(',').map(|d| d.trim().to_string()).collect();
        }
    }

    /// Replace empty paths with defaults and reject a malformed version override
    fn validate(&mut self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            warn!(using = %default_store_path().display(), "store_path is empty, using default");
            self.store_path = default_store_path();
        }
        if self.spaces_path.as_os_str().is_empty() {
            warn!(using = %default_spaces_path().display(), "spaces_path is empty, using default");
            self.spaces_path = default_spaces_path();
        }
        if self.preferences_dir.as_os_str().is_empty() {
            warn!(
                using = %default_preferences_dir().display(),
                "preferences_dir is empty, using default"
            );
            self.preferences_dir = default_preferences_dir();
        }
        let before = self.module_dirs.len();
        self.module_dirs.retain(|d| !d.as_os_str().is_empty());
        if self.module_dirs.len() != before {
            warn!(dropped = before - self.module_dirs.len(), "Ignoring empty module_dirs entries");
        }
        self.displays.retain(|d| !d.trim().is_empty());
        if self.os_version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            self.os_version = None;
        }
        if let Some(raw) = &self.os_version {
            if let Err(e) = raw.parse::<OsVersion>() {
                bail!("Invalid os_version '{raw}': {e}");
            }
        }
        Ok(())
    }

    pub fn locations(&self) -> StoreLocations {
        StoreLocations {
            store: self.store_path.clone(),
            spaces: self.spaces_path.clone(),
            preferences_dir: self.preferences_dir.clone(),
        }
    }

    /// Configured displays, the first one main and screen ids numbered from 1
    pub fn configured_displays(&self) -> Option<Vec<DisplayDescriptor>> {
        if self.displays.is_empty() {
            return None;
        }
        Some(
            self.displays
                .iter()
                .enumerate()
                .map(|(i, uuid)| {
                    let descriptor = DisplayDescriptor::new(uuid.clone()).with_screen(i as u32 + 1);
                    if i == 0 { descriptor.main() } else { descriptor }
                })
                .collect(),
        )
    }

    /// Fixed probe for a configured version, else `sw_vers`
    pub fn version_probe(&self) -> Result<VersionProbe> {
        match &self.os_version {
            Some(raw) => {
                let parsed: OsVersion = raw
                    .parse()
                    .context(format!("Invalid os_version '{raw}'"))?;
                info!(version = %parsed, "Using configured OS version");
                Ok(version::fixed(parsed))
            }
            None => Ok(version::sw_vers()),
        }
    }
}
