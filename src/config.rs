//! Configuration
//!
//! Loaded once at startup from a JSON file. Every field has a default, so a
//! partial file is fine; a missing file is written out with the defaults so
//! there is something to edit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "CASEMENT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub geometry: GeometryConfig,
    pub os: OsConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub restore_settle_ms: u64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            min_width: 16,
            min_height: 16,
            restore_settle_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsConfig {
    /// Upper bound on one façade call, snapshot and mutation included
    pub call_timeout_ms: u64,
    pub enumeration_retry_backoff_ms: u64,
}

impl Default for OsConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 2000,
            enumeration_retry_backoff_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Window titles treated as if the window had no title
    pub ignored_titles: Vec<String>,
    /// Image names never listed as applications (case-insensitive)
    pub excluded_images: Vec<String>,
}

const DEFAULT_IGNORED_TITLES: &[&str] = &["Default IME", "MSCTFIME UI", "Program Manager"];

const DEFAULT_EXCLUDED_IMAGES: &[&str] = &[
    "system",
    "smss.exe",
    "csrss.exe",
    "wininit.exe",
    "winlogon.exe",
    "services.exe",
    "lsass.exe",
    "svchost.exe",
    "spoolsv.exe",
    "dwm.exe",
    "audiodg.exe",
    "conhost.exe",
    "taskmgr.exe",
    "cmd.exe",
    "powershell.exe",
    "wuauclt.exe",
    "mmc.exe",
    "rundll32.exe",
    "dllhost.exe",
    "sihost.exe",
    "fontdrvhost.exe",
    "winrt.exe",
    "runtimebroker.exe",
    "backgroundtaskhost.exe",
];

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignored_titles: DEFAULT_IGNORED_TITLES.iter().map(|s| s.to_string()).collect(),
            excluded_images: DEFAULT_EXCLUDED_IMAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Config file location: `$CASEMENT_CONFIG`, else the platform config dir
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("casement").join("config.json"))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Write the config to `path` as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| write_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(path, contents).map_err(write_error)
    }

    /// Load from `path`, writing the defaults there first if it does not exist.
    ///
    /// Never fails: any problem falls back to the defaults and is returned
    /// as a warning. Failing to write the default file is only a warning too.
    pub fn load_or_create(path: &Path) -> (Self, Option<ConfigError>) {
        if !path.exists() {
            let config = Self::default();
            return match config.save(path) {
                Ok(()) => (config, None),
                Err(e) => (config, Some(e)),
            };
        }

        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load from the default location, falling back to defaults on any error.
    ///
    /// Logging is not initialised yet when this runs, so the returned warning
    /// is handed back to the caller to report once it is.
    pub fn load() -> (Self, Option<ConfigError>) {
        match Self::default_path() {
            Some(path) => Self::load_or_create(&path),
            None => (Self::default(), None),
        }
    }

    fn normalized(mut self) -> Self {
        self.geometry.min_width = self.geometry.min_width.max(1);
        self.geometry.min_height = self.geometry.min_height.max(1);
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.os.call_timeout_ms)
    }

    pub fn enumeration_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.os.enumeration_retry_backoff_ms)
    }

    pub fn restore_settle(&self) -> Duration {
        Duration::from_millis(self.geometry.restore_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"geometry": {{"min_width": 200}}, "log": {{"format": "json"}}}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.geometry.min_width, 200);
        assert_eq!(config.geometry.min_height, 16);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.os.call_timeout_ms, 2000);
        assert!(config.filter.excluded_images.contains(&"dwm.exe".to_string()));
    }

    #[test]
    fn test_zero_minimum_extent_is_clamped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"geometry": {{"min_width": 0, "min_height": 0}}}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.geometry.min_width, 1);
        assert_eq!(config.geometry.min_height, 1);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("casement").join("config.json");

        let (config, warning) = Config::load_or_create(&path);
        assert!(warning.is_none());
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // The written file reads back as the same defaults
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"geometry\""));
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"os": {{"call_timeout_ms": 750}}}}"#).unwrap();

        let (config, warning) = Config::load_or_create(file.path());
        assert!(warning.is_none());
        assert_eq!(config.os.call_timeout_ms, 750);
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, r#"{"os": {"call_timeout_ms": 750}}"#);
    }

    #[test]
    fn test_unwritable_location_still_yields_defaults() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot be used as a directory
        let path = blocker.path().join("casement").join("config.json");

        let (config, warning) = Config::load_or_create(&path);
        assert_eq!(config, Config::default());
        assert!(matches!(warning, Some(ConfigError::Write { .. })));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(2));
        assert_eq!(config.enumeration_retry_backoff(), Duration::from_millis(50));
        assert_eq!(config.restore_settle(), Duration::from_millis(500));
    }
}
