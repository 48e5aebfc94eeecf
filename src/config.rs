//! Runtime environment selection and configuration.
//!
//! Configuration comes from an optional TOML file (path in
//! `BURROW_CONFIG`) with built-in defaults, then per-variable process
//! overrides: `ENV` picks the runtime environment, `BURROW_DB` the
//! database path. The loaded value is plain data — construct it at
//! startup and hand it to whatever opens the store; there is no global.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Which environment the process is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnv {
    #[default]
    Dev,
    Test,
    Staging,
    Prod,
}

impl RuntimeEnv {
    /// Parse the `ENV` variable's value, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "staging" => Ok(Self::Staging),
            "prod" => Ok(Self::Prod),
            other => Err(ConfigError::UnknownEnv(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    pub fn is_test(self) -> bool {
        self == Self::Test
    }

    pub fn is_prod(self) -> bool {
        self == Self::Prod
    }
}

/// Process configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runtime environment (`ENV` override).
    pub env: RuntimeEnv,
    /// Where the SQLite database lives (`BURROW_DB` override).
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: RuntimeEnv::Dev,
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "burrow-labs", "burrow")
        .map(|dirs| dirs.data_dir().join("burrow.db"))
        .unwrap_or_else(|| PathBuf::from("burrow.db"))
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var("BURROW_CONFIG").ok();
        Self::from_sources(
            config_file.as_deref(),
            std::env::var("ENV").ok().as_deref(),
            std::env::var("BURROW_DB").ok().as_deref(),
        )
    }

    /// Pure core of [`Config::load`]: explicit sources, no environment
    /// reads. A named-but-missing config file falls back to defaults;
    /// an unreadable one is an error.
    pub fn from_sources(
        config_file: Option<&str>,
        env_override: Option<&str>,
        db_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) if Path::new(path).exists() => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.to_string(),
                        source,
                    })?;
                toml::from_str(&content)?
            }
            Some(path) => {
                tracing::debug!(path, "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        if let Some(env) = env_override {
            config.env = RuntimeEnv::parse(env)?;
        }
        if let Some(db) = db_override {
            config.database_path = PathBuf::from(db);
        }
        Ok(config)
    }
}
