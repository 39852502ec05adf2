//! Synchronization settings and options.
//!
//! # Responsibility
//! - Provide the immutable `SyncConfig` record handed to adapters and the
//!   engine.
//! - Load layered TOML overrides (user config dir, then source dir).
//!
//! # Invariants
//! - Missing keys keep their defaults; values of the wrong type are
//!   skipped per field with a warning, never fatal.
//! - `settings.default_date_time` is validated once while loading.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// File name looked up in the user config dir and next to the source.
pub const CONFIG_FILE_NAME: &str = "storysync.toml";

const APP_DIR_NAME: &str = "storysync";
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Errors from reading or writing config files.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    Serialize(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot access `{}`: {source}", path.display()),
            Self::Parse { path, message } => {
                write!(f, "invalid config file `{}`: {message}", path.display())
            }
            Self::Serialize(message) => write!(f, "cannot serialize config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Names of template elements and colors used in the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub narrative_arc: String,
    pub property_description: String,
    pub property_notes: String,
    pub role_location: String,
    pub role_item: String,
    pub role_character: String,
    pub type_character: String,
    pub type_location: String,
    pub type_item: String,
    pub color_scene: String,
    pub color_event: String,
    /// Anchor for synthetic timestamps of undated events. Empty means
    /// "today at midnight".
    pub default_date_time: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            narrative_arc: "Narrative".to_string(),
            property_description: "Description".to_string(),
            property_notes: "Notes".to_string(),
            role_location: "Location".to_string(),
            role_item: "Item".to_string(),
            role_character: "Participant".to_string(),
            type_character: "Character".to_string(),
            type_location: "Location".to_string(),
            type_item: "Item".to_string(),
            color_scene: "Red".to_string(),
            color_event: "Yellow".to_string(),
            default_date_time: String::new(),
        }
    }
}

/// Boolean switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Synchronize only narrative scenes; background scenes stay local.
    pub scenes_only: bool,
    /// Maintain a moon phase property on timeline events.
    pub add_moonphase: bool,
    /// Split novel scenes at `# `/`## ` divider lines after merging.
    pub split_scenes: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            scenes_only: true,
            add_moonphase: false,
            split_scenes: false,
        }
    }
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub settings: SyncSettings,
    pub options: SyncOptions,
}

impl SyncConfig {
    /// Reference date-time for undated events.
    pub fn reference_time(&self) -> NaiveDateTime {
        parse_date_time(&self.settings.default_date_time).unwrap_or_else(today_midnight)
    }

    /// Applies one TOML layer on top of the current values.
    pub fn apply_toml(&mut self, text: &str, origin: &Path) -> Result<(), ConfigError> {
        let table = text
            .parse::<toml::Table>()
            .map_err(|err| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: err.to_string(),
            })?;

        if let Some(settings) = table.get("settings").and_then(toml::Value::as_table) {
            self.apply_settings(settings, origin);
        }
        if let Some(options) = table.get("options").and_then(toml::Value::as_table) {
            self.apply_options(options, origin);
        }
        Ok(())
    }

    fn apply_settings(&mut self, table: &toml::Table, origin: &Path) {
        let settings = &mut self.settings;
        for (key, value) in table {
            let slot = match key.as_str() {
                "narrative_arc" => &mut settings.narrative_arc,
                "property_description" => &mut settings.property_description,
                "property_notes" => &mut settings.property_notes,
                "role_location" => &mut settings.role_location,
                "role_item" => &mut settings.role_item,
                "role_character" => &mut settings.role_character,
                "type_character" => &mut settings.type_character,
                "type_location" => &mut settings.type_location,
                "type_item" => &mut settings.type_item,
                "color_scene" => &mut settings.color_scene,
                "color_event" => &mut settings.color_event,
                "default_date_time" => &mut settings.default_date_time,
                _ => continue,
            };
            if let Some(parsed) = field_value::<String>(key, value, origin) {
                *slot = parsed;
            }
        }

        let anchor = self.settings.default_date_time.trim();
        if !anchor.is_empty() && parse_date_time(anchor).is_none() {
            warn!(
                "event=config_field_ignored module=config status=error key=default_date_time file={}",
                origin.display()
            );
            self.settings.default_date_time = String::new();
        }
    }

    fn apply_options(&mut self, table: &toml::Table, origin: &Path) {
        let options = &mut self.options;
        for (key, value) in table {
            let slot = match key.as_str() {
                "scenes_only" => &mut options.scenes_only,
                "add_moonphase" => &mut options.add_moonphase,
                "split_scenes" => &mut options.split_scenes,
                _ => continue,
            };
            if let Some(parsed) = field_value::<bool>(key, value, origin) {
                *slot = parsed;
            }
        }
    }
}

fn field_value<T: DeserializeOwned>(key: &str, value: &toml::Value, origin: &Path) -> Option<T> {
    match value.clone().try_into::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                "event=config_field_ignored module=config status=error key={} file={}",
                key,
                origin.display()
            );
            None
        }
    }
}

fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn today_midnight() -> NaiveDateTime {
    Local::now().date_naive().and_time(NaiveTime::MIN)
}

/// Returns the per-user config file path, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
    Some(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Returns the config file path next to `source`.
pub fn source_config_path(source: &Path) -> PathBuf {
    let dir = source
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    dir.join(CONFIG_FILE_NAME)
}

/// Loads defaults overridden by each existing file in `paths`, in order.
///
/// Unreadable or malformed files are skipped with a warning.
pub fn load_layers(paths: &[PathBuf]) -> SyncConfig {
    let mut config = SyncConfig::default();
    for path in paths {
        if !path.is_file() {
            continue;
        }
        let result = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })
            .and_then(|text| config.apply_toml(&text, path));
        match result {
            Ok(()) => log::debug!(
                "event=config_layer_applied module=config status=ok file={}",
                path.display()
            ),
            Err(err) => warn!(
                "event=config_layer_skipped module=config status=error reason={}",
                err
            ),
        }
    }
    config
}

/// Loads the user layer, then the layer next to `source`.
pub fn load_for_source(source: &Path) -> SyncConfig {
    let mut paths = Vec::new();
    if let Some(user) = user_config_path() {
        paths.push(user);
    }
    paths.push(source_config_path(source));
    load_layers(&paths)
}

/// Writes the built-in defaults to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(&SyncConfig::default())
        .map_err(|err| ConfigError::Serialize(err.to_string()))?;
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
