//! Runtime configuration for core callers.
//!
//! # Responsibility
//! - Describe where the database lives, how logging is set up and which
//!   owner id new todos get.
//! - Load from TOML and apply `TODO_*` environment overrides.
//!
//! # Invariants
//! - Configuration is an explicit value passed to constructors; core keeps
//!   no global config state.

use crate::logging::default_log_level;
use crate::model::todo::DEFAULT_USER_ID;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "TODO_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TODO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODO_LOG_DIR";
pub const ENV_USER_ID: &str = "TODO_USER_ID";

const DEFAULT_DB_FILE_NAME: &str = "todos.sqlite3";

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TodoConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Owner assigned to todos created without an explicit user.
    pub default_user_id: String,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            default_user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

impl TodoConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Applies `TODO_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup. Blank values are ignored.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_USER_ID) {
            self.default_user_id = value;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        if self.default_user_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_user_id cannot be blank".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
