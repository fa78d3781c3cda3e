use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::page::LayoutMode;
use crate::view::{FitMode, ZoomLimits};
use crate::viewport::ReadingDirection;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagestrip";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Viewer defaults. Read once at startup, never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: f32,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f32,

    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    #[serde(default)]
    pub fit_mode: FitMode,

    #[serde(default)]
    pub layout_mode: LayoutMode,

    #[serde(default)]
    pub reading_direction: ReadingDirection,

    /// Paint on a background thread when the host allows it
    #[serde(default = "default_true")]
    pub prefer_render_thread: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_min_zoom() -> f32 {
    ZoomLimits::MIN_ZOOM
}

fn default_max_zoom() -> f32 {
    ZoomLimits::MAX_ZOOM
}

fn default_zoom_step() -> f32 {
    ZoomLimits::ZOOM_STEP
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
            fit_mode: FitMode::default(),
            layout_mode: LayoutMode::default(),
            reading_direction: ReadingDirection::default(),
            prefer_render_thread: true,
        }
    }
}

impl Settings {
    /// Zoom bounds with invalid values replaced by defaults
    #[must_use]
    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits::sanitized(self.min_zoom, self.max_zoom, self.zoom_step)
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load the user's config file if there is one; defaults otherwise
pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if !path.exists() {
        info!("No settings file at {path:?}, using defaults");
        return;
    }
    if let Err(e) = load_settings_from_path(&path) {
        error!("{e}");
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<(), SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = parse_settings(&content)?;
    debug!("Loaded settings from {path:?}");

    if let Ok(mut global) = SETTINGS.write() {
        *global = settings;
    }
    Ok(())
}

pub fn parse_settings(content: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = serde_yaml::from_str(content)?;
    if settings.version > CURRENT_VERSION {
        warn!(
            "Settings version {} is newer than supported {CURRENT_VERSION}",
            settings.version
        );
    }
    Ok(settings)
}

/// Replace the in-memory settings (command-line overrides, tests)
pub fn override_settings(settings: Settings) {
    if let Ok(mut global) = SETTINGS.write() {
        *global = settings;
    }
}

// Public API for reading settings

pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn zoom_limits() -> ZoomLimits {
    SETTINGS
        .read()
        .map(|s| s.zoom_limits())
        .unwrap_or_default()
}

pub fn get_fit_mode() -> FitMode {
    SETTINGS.read().map(|s| s.fit_mode).unwrap_or_default()
}

pub fn get_layout_mode() -> LayoutMode {
    SETTINGS.read().map(|s| s.layout_mode).unwrap_or_default()
}

pub fn get_reading_direction() -> ReadingDirection {
    SETTINGS
        .read()
        .map(|s| s.reading_direction)
        .unwrap_or_default()
}

pub fn prefers_render_thread() -> bool {
    SETTINGS
        .read()
        .map(|s| s.prefer_render_thread)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = parse_settings("layout_mode: double\n").unwrap();
        assert_eq!(settings.layout_mode, LayoutMode::Double);
        assert_eq!(settings.zoom_limits(), ZoomLimits::default());
        assert!(settings.prefer_render_thread);
    }

    #[test]
    fn all_fields_parse() {
        let yaml = "\
min_zoom: 0.5
max_zoom: 4.0
zoom_step: 0.25
fit_mode: fit_width
layout_mode: vertical
reading_direction: right_to_left
prefer_render_thread: false
";
        let settings = parse_settings(yaml).unwrap();
        assert_eq!(settings.fit_mode, FitMode::FitWidth);
        assert_eq!(settings.reading_direction, ReadingDirection::RightToLeft);
        let limits = settings.zoom_limits();
        assert_eq!((limits.min_zoom, limits.max_zoom, limits.zoom_step), (0.5, 4.0, 0.25));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_settings("min_zoom: [nope"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    #[serial]
    fn load_from_path_updates_globals() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fit_mode: fill\nprefer_render_thread: false").unwrap();
        load_settings_from_path(file.path()).unwrap();
        assert_eq!(get_fit_mode(), FitMode::Fill);
        assert!(!prefers_render_thread());

        override_settings(Settings::default());
        assert!(prefers_render_thread());
    }

    #[test]
    #[serial]
    fn unreadable_path_leaves_globals_alone() {
        override_settings(Settings::default());
        let err = load_settings_from_path(Path::new("/no/such/config.yaml")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
        assert_eq!(current(), Settings::default());
    }
}
