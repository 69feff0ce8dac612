//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Settings file location
pub mod config {
    /// Application directory name under the user config dir
    pub const APP_DIR: &str = "wallsaver";

    /// Settings filename
    pub const FILENAME: &str = "config.toml";

    /// Environment overrides applied on top of the settings file
    pub const STORE_ENV: &str = "WALLSAVER_STORE";
    pub const SPACES_ENV: &str = "WALLSAVER_SPACES";
    pub const PREFS_DIR_ENV: &str = "WALLSAVER_PREFS_DIR";

    /// Comma-separated display UUIDs, main display first
    pub const DISPLAYS_ENV: &str = "WALLSAVER_DISPLAYS";

    /// Log level used when neither `LOG_LEVEL` nor the settings file set one
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

/// Default per-user locations of the stores we read and write
pub mod paths {
    /// Modern store, relative to the home directory
    pub const STORE: &str = "Library/Application Support/com.apple.wallpaper/Store/Index.plist";

    /// Space-management preference domain, relative to the home directory
    pub const SPACES: &str = "Library/Preferences/com.apple.spaces.plist";

    /// Per-host preference domains, relative to the home directory
    pub const PREFERENCES_DIR: &str = "Library/Preferences/ByHost";

    /// Suffix appended to a store path for its pre-write copy
    pub const BACKUP_SUFFIX: &str = ".backup";

    /// System-wide screen saver bundles
    pub const SYSTEM_SCREEN_SAVERS: &str = "/System/Library/Screen Savers";

    /// Locally installed screen saver bundles
    pub const LOCAL_SCREEN_SAVERS: &str = "/Library/Screen Savers";

    /// Per-user screen saver bundles, relative to the home directory
    pub const USER_SCREEN_SAVERS: &str = "Library/Screen Savers";

    /// System app extensions (screen saver extensions live here)
    pub const SYSTEM_EXTENSIONS: &str = "/System/Library/ExtensionKit/Extensions";

    /// Prefix marking a directory as system-owned
    pub const SYSTEM_ROOT: &str = "/System";
}

/// Key names inside the modern store tree
pub mod keys {
    pub const DISPLAYS: &str = "Displays";
    pub const SPACES: &str = "Spaces";
    pub const DEFAULT: &str = "Default";
    pub const IDLE: &str = "Idle";
    pub const DESKTOP: &str = "Desktop";
    pub const CONTENT: &str = "Content";
    pub const CHOICES: &str = "Choices";
    pub const ENCODED_OPTION_VALUES: &str = "EncodedOptionValues";
    pub const SHUFFLE: &str = "Shuffle";
    pub const PROVIDER: &str = "Provider";
    pub const CONFIGURATION: &str = "Configuration";
    pub const FILES: &str = "Files";
    pub const RELATIVE: &str = "relative";

    /// Placeholder the OS agent writes for an unset optional value
    pub const NULL: &str = "$null";
}

/// Provider identifiers stored in `Choice.Provider`
pub mod providers {
    /// Screen saver modules (.saver bundles and app extensions)
    pub const SCREEN_SAVER: &str = "com.apple.wallpaper.choice.screen-saver";

    /// Aerial video screen savers
    pub const SEQUOIA_VIDEO: &str = "com.apple.wallpaper.choice.sequoia";

    /// Built-in "Macintosh" screen saver
    pub const MACINTOSH: &str = "com.apple.wallpaper.choice.macintosh";

    /// The system default screen saver
    pub const DEFAULT: &str = "default";

    /// Still image wallpaper
    pub const IMAGE: &str = "com.apple.wallpaper.choice.image";
}

/// Names of the screen savers that have no bundle on disk
pub mod builtins {
    pub const AERIAL: &str = "Aerial";
    pub const DEFAULT: &str = "Default";
    pub const MACINTOSH: &str = "Macintosh";
}

/// Observed payload constants (best-effort, see DESIGN.md)
pub mod payload {
    /// `legacyScreenSaverGenerationCount` written for app extension savers
    pub const LEGACY_GENERATION_COUNT: i64 = 4;

    /// `style` written for app extension savers
    pub const EXTENSION_STYLE: &str = "dynamic";

    /// `appearance` written for aerial video savers
    pub const VIDEO_APPEARANCE: &str = "automatic";

    /// Picker id written for both observed payloads
    pub const PICKER_ID: i64 = 0;

    /// `type` value of an image wallpaper configuration
    pub const IMAGE_FILE_TYPE: &str = "imageFile";
}

/// Space-management preference domain keys
pub mod spaces {
    pub const DISPLAY_CONFIGURATION: &str = "SpacesDisplayConfiguration";
    pub const MANAGEMENT_DATA: &str = "Management Data";
    pub const MONITORS: &str = "Monitors";
    pub const DISPLAY_IDENTIFIER: &str = "Display Identifier";
    pub const CURRENT_SPACE: &str = "Current Space";
    pub const SPACES: &str = "Spaces";
    pub const COLLAPSED_SPACE: &str = "Collapsed Space";
    pub const UUID: &str = "uuid";
    pub const MANAGED_SPACE_ID: &str = "ManagedSpaceID";
    pub const TYPE: &str = "type";

    /// Monitor identifier used when only one display is attached
    pub const MAIN_DISPLAY: &str = "Main";
}

/// Legacy (pre-Sonoma) preference domains and keys
pub mod legacy {
    pub const SCREENSAVER_DOMAIN: &str = "com.apple.screensaver";
    pub const DESKTOP_DOMAIN: &str = "com.apple.desktop";

    pub const MODULE_DICT: &str = "moduleDict";
    pub const MODULE_NAME: &str = "moduleName";
    pub const MODULE_PATH: &str = "path";
    pub const MODULE_TYPE: &str = "type";

    pub const BACKGROUND: &str = "Background";
    pub const BACKGROUND_DEFAULT: &str = "default";
    pub const IMAGE_FILE_PATH: &str = "ImageFilePath";
    pub const PLACEMENT: &str = "Placement";

    /// Idle timeout in seconds, shared by both schemes
    pub const IDLE_TIME: &str = "idleTime";
}

/// Version gate between the two schemes
pub mod version {
    /// First major version with the per-display, per-space store (Sonoma)
    pub const MODERN_MAJOR: u32 = 14;

    /// Environment variable overriding the detected version
    pub const OVERRIDE_ENV: &str = "WALLSAVER_OS_VERSION";
}
