//! Minimal configuration loading for Ovation.
//!
//! Precedence, lowest to highest: built-in defaults, a TOML config file,
//! `OVATION_*` environment variables. The binary's CLI flags sit on top of
//! all three.
//!
//! ```toml
//! [rating]
//! max_rating = 5
//!
//! [paths]
//! data_dir = "/var/lib/ovation/data"
//! log_dir = "/var/lib/ovation/logs"
//!
//! [bind]
//! port = 8080
//!
//! [admin]
//! username = "admin"
//! password = "change-me"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Rating rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Highest allowed star value; ratings are 1..=max_rating.
    pub max_rating: u32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self { max_rating: 5 }
    }
}

/// Filesystem locations for the data documents and the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_base_dir().join("data"),
            log_dir: default_base_dir().join("logs"),
        }
    }
}

/// Network binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    pub port: u16,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Administrator credentials for the admin surface.
///
/// The defaults exist for development only; override both in production.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OvationConfig {
    pub rating: RatingConfig,
    pub paths: PathsConfig,
    pub bind: BindConfig,
    pub admin: AdminConfig,
}

/// Default base directory (~/.ovation).
fn default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".ovation"))
        .unwrap_or_else(|| PathBuf::from(".ovation"))
}

impl OvationConfig {
    /// Load from a TOML file; missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay `OVATION_*` environment variables onto this config.
    ///
    /// Unparseable numeric values are ignored rather than fatal.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("OVATION_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("OVATION_LOG_DIR") {
            self.paths.log_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("OVATION_PORT") {
            if let Ok(port) = v.parse() {
                self.bind.port = port;
            }
        }
        if let Ok(v) = env::var("OVATION_MAX_RATING") {
            if let Ok(max) = v.parse() {
                self.rating.max_rating = max;
            }
        }
        if let Ok(v) = env::var("OVATION_ADMIN_USERNAME") {
            self.admin.username = v;
        }
        if let Ok(v) = env::var("OVATION_ADMIN_PASSWORD") {
            self.admin.password = v;
        }
    }

    /// Path of the append-only rating audit log.
    pub fn rating_log_file(&self) -> PathBuf {
        self.paths.log_dir.join("ratings.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OvationConfig::default();
        assert_eq!(config.rating.max_rating, 5);
        assert_eq!(config.bind.port, 8080);
        assert_eq!(config.admin.username, "admin");
        assert!(config.paths.data_dir.to_string_lossy().contains(".ovation"));
        assert!(config
            .rating_log_file()
            .to_string_lossy()
            .ends_with("ratings.log"));
    }

    #[test]
    fn test_from_file_partial_sections() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("ovation.toml");
        std::fs::write(
            &path,
            r#"
[rating]
max_rating = 10

[paths]
data_dir = "/srv/ovation/data"
"#,
        )
        .unwrap();

        let config = OvationConfig::from_file(&path).unwrap();
        assert_eq!(config.rating.max_rating, 10);
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/ovation/data"));
        // Untouched sections keep defaults
        assert_eq!(config.bind.port, 8080);
        assert_eq!(config.admin.password, "admin");
    }

    #[test]
    fn test_from_file_full() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("ovation.toml");
        std::fs::write(
            &path,
            r#"
[rating]
max_rating = 6

[paths]
data_dir = "/data"
log_dir = "/logs"

[bind]
port = 9000

[admin]
username = "ops"
password = "s3cret"
"#,
        )
        .unwrap();

        let config = OvationConfig::from_file(&path).unwrap();
        assert_eq!(config.rating.max_rating, 6);
        assert_eq!(config.paths.log_dir, PathBuf::from("/logs"));
        assert_eq!(config.bind.port, 9000);
        assert_eq!(config.admin.username, "ops");
        assert_eq!(config.admin.password, "s3cret");
        assert_eq!(config.rating_log_file(), PathBuf::from("/logs/ratings.log"));
    }

    #[test]
    fn test_from_file_missing() {
        let result = OvationConfig::from_file(Path::new("/nonexistent/ovation.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn test_from_file_malformed() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "not [valid toml").unwrap();

        let result = OvationConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    // One test for all env handling: the variables are process-global and
    // the test harness runs in parallel.
    #[test]
    fn test_env_overrides() {
        env::set_var("OVATION_PORT", "9999");
        env::set_var("OVATION_MAX_RATING", "7");
        env::set_var("OVATION_ADMIN_USERNAME", "root");

        let mut config = OvationConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.bind.port, 9999);
        assert_eq!(config.rating.max_rating, 7);
        assert_eq!(config.admin.username, "root");

        // Unparseable numbers are ignored
        env::set_var("OVATION_PORT", "not-a-port");
        let mut config = OvationConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.bind.port, 8080);

        env::remove_var("OVATION_PORT");
        env::remove_var("OVATION_MAX_RATING");
        env::remove_var("OVATION_ADMIN_USERNAME");
    }
}
