//! # Config Module
//!
//! Process-wide settings, stored as JSON in the per-user config directory:
//! - Linux: `~/.config/shot-ledger/config.json`
//! - macOS: `~/Library/Application Support/shot-ledger/config.json`
//! - Windows: `%APPDATA%\shot-ledger\config.json`
//!
//! Missing fields take their defaults, so older config files keep loading.

use crate::core::export::SESSION_LOG_FILENAME;
use crate::core::fsops::write_atomic;
use crate::core::naming::DuplicatePolicy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory name under the per-user config and data dirs
pub const APP_NAME: &str = "shot-ledger";

const CONFIG_FILE_NAME: &str = "config.json";
const RECOVERY_FILE_NAME: &str = "active_session.json";

/// How many recent project folders are remembered
pub const MAX_RECENT_PROJECTS: usize = 5;

/// What to do with an active session when the application closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExit {
    /// Leave the session for the next launch to resume
    #[default]
    KeepSession,
    /// End it: purge trash, clear records, reset the log
    EndSession,
    /// Ask the user
    Ask,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub duplicate_handling: DuplicatePolicy,
    /// Move deleted photos to the trash instead of removing them
    pub use_trash: bool,
    pub confirm_delete: bool,
    pub on_exit: OnExit,
    /// Trash entries kept for undo before the oldest is purged
    pub undo_delete_limit: usize,
    /// Empty the session trash when the session ends
    pub auto_empty_trash: bool,
    pub confirm_end_session: bool,
    /// Append to the session log after every capture
    pub realtime_log: bool,
    pub jpeg_quality: u8,
    pub camera_index: u32,
    pub last_project: Option<PathBuf>,
    pub recent_projects: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duplicate_handling: DuplicatePolicy::Ask,
            use_trash: true,
            confirm_delete: true,
            on_exit: OnExit::KeepSession,
            undo_delete_limit: 10,
            auto_empty_trash: true,
            confirm_end_session: true,
            realtime_log: true,
            jpeg_quality: 95,
            camera_index: 0,
            last_project: None,
            recent_projects: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save to `path`, creating its directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, json.as_bytes()).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Names of all settings, sorted
    pub fn keys() -> Vec<String> {
        match serde_json::to_value(Self::default()) {
            Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Current value of one setting as JSON
    pub fn get(&self, key: &str) -> Result<serde_json::Value, ConfigError> {
        let value = serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        value
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
    }

    /// Change one setting from its text form.
    ///
    /// The text is parsed as JSON first (`true`, `10`, `null`) and treated
    /// as a plain string otherwise (`auto_increment`, a folder path).
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let mut value = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let slot = value
            .get_mut(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        *slot = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

        *self = serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Move `folder` to the front of the recent list and make it the last project
    pub fn add_recent_project(&mut self, folder: &Path) {
        let folder = folder.to_path_buf();
        self.recent_projects.retain(|p| p != &folder);
        self.recent_projects.insert(0, folder.clone());
        self.recent_projects.truncate(MAX_RECENT_PROJECTS);
        self.last_project = Some(folder);
    }

    /// Trash retention as handed to the trash manager
    pub fn trash_limit(&self) -> Option<usize> {
        Some(self.undo_delete_limit)
    }

    /// Whether deleted photos go to the trash. An undo limit of zero leaves
    /// nothing to undo, so it deletes permanently like `use_trash = false`.
    pub fn keeps_trash(&self) -> bool {
        self.use_trash && self.undo_delete_limit > 0
    }
}

/// Where the application keeps its own files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub recovery_file: PathBuf,
    pub session_log: PathBuf,
}

impl AppPaths {
    /// Standard per-user locations
    pub fn for_user() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoUserDirectory("config"))?;
        let data_dir = dirs::data_local_dir().ok_or(ConfigError::NoUserDirectory("data"))?;
        Ok(Self {
            config_file: config_dir.join(APP_NAME).join(CONFIG_FILE_NAME),
            recovery_file: data_dir.join(APP_NAME).join(RECOVERY_FILE_NAME),
            session_log: data_dir.join(APP_NAME).join(SESSION_LOG_FILENAME),
        })
    }

    /// Everything under one directory (tests, portable installs)
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config_file: dir.join(CONFIG_FILE_NAME),
            recovery_file: dir.join(RECOVERY_FILE_NAME),
            session_log: dir.join(SESSION_LOG_FILENAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(&temp.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.undo_delete_limit, 10);
        assert_eq!(config.duplicate_handling, DuplicatePolicy::Ask);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"duplicate_handling": "replace", "use_trash": false}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.duplicate_handling, DuplicatePolicy::Replace);
        assert!(!config.use_trash);
        assert!(config.confirm_delete);
        assert_eq!(config.on_exit, OnExit::KeepSession);
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.on_exit = OnExit::Ask;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap().on_exit, OnExit::Ask);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn set_parses_json_and_plain_strings() {
        let mut config = Config::default();
        config.set("use_trash", "false").unwrap();
        config.set("duplicate_handling", "auto_increment").unwrap();
        config.set("undo_delete_limit", "3").unwrap();

        assert!(!config.use_trash);
        assert_eq!(config.duplicate_handling, DuplicatePolicy::AutoIncrement);
        assert_eq!(config.get("undo_delete_limit").unwrap(), serde_json::json!(3));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("colour", "blue"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.set("duplicate_handling", "sometimes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn recent_projects_are_capped_and_deduplicated() {
        let mut config = Config::default();
        for i in 0..7 {
            config.add_recent_project(Path::new(&format!("/p/{}", i)));
        }
        config.add_recent_project(Path::new("/p/4"));

        assert_eq!(config.recent_projects.len(), MAX_RECENT_PROJECTS);
        assert_eq!(config.recent_projects[0], PathBuf::from("/p/4"));
        assert_eq!(config.recent_projects[1], PathBuf::from("/p/6"));
        assert_eq!(config.last_project, Some(PathBuf::from("/p/4")));
    }

    #[test]
    fn zero_undo_limit_disables_trash() {
        let mut config = Config::default();
        assert!(config.keeps_trash());

        config.undo_delete_limit = 0;
        assert!(!config.keeps_trash());

        config.undo_delete_limit = 3;
        config.use_trash = false;
        assert!(!config.keeps_trash());
    }

    #[test]
    fn paths_in_dir() {
        let paths = AppPaths::in_dir(Path::new("/tmp/x"));
        assert_eq!(paths.session_log, PathBuf::from("/tmp/x/Session_Data.xlsx"));
        assert!(paths.recovery_file.ends_with("active_session.json"));
    }
}
