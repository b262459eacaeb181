//! Configuration management

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndagateConfig {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    /// In-process only, nothing survives a restart
    Memory,
    /// Single-file embedded database
    #[default]
    Redb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub engine: StorageEngine,
    /// Database file; a leading `~` is the home directory
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: StorageEngine::Redb,
            path: "~/.indagate/indagate.redb".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self {
            engine: StorageEngine::Memory,
            path: String::new(),
        }
    }

    pub fn redb<P: AsRef<Path>>(path: P) -> Self {
        Self {
            engine: StorageEngine::Redb,
            path: path.as_ref().to_string_lossy().into_owned(),
        }
    }

    /// `path` with `~` expanded
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Longest accepted session, one year
pub const MAX_SESSION_LENGTH_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_length_minutes: i64,
    /// Random bytes per generated token, before encoding
    pub token_size: usize,
    /// Argon2 passes per password hash
    pub password_cost: u32,
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_length_minutes: 60,
            token_size: 64,
            password_cost: 2,
            min_password_length: 8,
        }
    }
}

impl IndagateConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid(format!("failed to read config file {}", path.display()))
                .with_op("config/read_file")
                .with_source(e)
        })?;

        let config: IndagateConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid("failed to parse config")
                .with_op("config/parse_toml")
                .with_source(e)
        })?;

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::invalid("failed to serialize config")
                .with_op("config/serialize_toml")
                .with_source(e)
        })?;

        std::fs::write(path.as_ref(), content).map_err(|e| {
            Error::invalid(format!(
                "failed to write config file {}",
                path.as_ref().display()
            ))
            .with_op("config/write_file")
            .with_source(e)
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(Error::invalid(message).with_op("config/validate"))
        };

        if self.auth.session_length_minutes <= 0 {
            return invalid("auth.session_length_minutes must be greater than 0");
        }
        if self.auth.session_length_minutes > MAX_SESSION_LENGTH_MINUTES {
            return invalid("auth.session_length_minutes must be at most one year");
        }
        if self.auth.token_size == 0 {
            return invalid("auth.token_size must be greater than 0");
        }
        if self.auth.password_cost == 0 {
            return invalid("auth.password_cost must be greater than 0");
        }
        if self.storage.engine == StorageEngine::Redb && self.storage.path.trim().is_empty() {
            return invalid("storage.path is required for the redb engine");
        }

        Ok(())
    }

    /// Overlay `INDAGATE_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(engine) = lookup("INDAGATE_STORAGE_ENGINE") {
            self.storage.engine = match engine.to_ascii_lowercase().as_str() {
                "memory" => StorageEngine::Memory,
                "redb" => StorageEngine::Redb,
                other => {
                    return Err(Error::invalid(format!("unknown storage engine {:?}", other))
                        .with_op("config/env"))
                }
            };
        }
        if let Some(path) = lookup("INDAGATE_STORAGE_PATH") {
            self.storage.path = path;
        }
        if let Some(minutes) = lookup("INDAGATE_SESSION_LENGTH_MINUTES") {
            self.auth.session_length_minutes = minutes.parse().map_err(|e| {
                Error::invalid(format!("INDAGATE_SESSION_LENGTH_MINUTES={:?}", minutes))
                    .with_op("config/env")
                    .with_source(e)
            })?;
        }
        if let Some(level) = lookup("INDAGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = IndagateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.engine, StorageEngine::Redb);
        assert_eq!(config.auth.session_length_minutes, 60);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("indagate.toml");

        let mut config = IndagateConfig::default();
        config.storage = StorageConfig::memory();
        config.auth.min_password_length = 12;
        config.save_to_file(&path).unwrap();

        let loaded = IndagateConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("indagate.toml");
        std::fs::write(&path, "[auth]\nsession_length_minutes = 5\n").unwrap();

        let loaded = IndagateConfig::from_file(&path).unwrap();
        assert_eq!(loaded.auth.session_length_minutes, 5);
        assert_eq!(loaded.auth.token_size, 64);
        assert_eq!(loaded.storage, StorageConfig::default());
    }

    #[test]
    fn missing_file_is_invalid() {
        let err = IndagateConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Invalid);
        assert_eq!(err.op.as_deref(), Some("config/read_file"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = IndagateConfig::default();
        config.auth.session_length_minutes = 0;
        assert_eq!(config.validate().unwrap_err().code(), ErrorCode::Invalid);

        let mut config = IndagateConfig::default();
        config.auth.session_length_minutes = i64::MAX;
        assert_eq!(config.validate().unwrap_err().code(), ErrorCode::Invalid);
        config.auth.session_length_minutes = MAX_SESSION_LENGTH_MINUTES;
        assert!(config.validate().is_ok());

        let mut config = IndagateConfig::default();
        config.storage.path = " ".into();
        assert!(config.validate().is_err());

        let mut config = IndagateConfig::default();
        config.storage = StorageConfig::memory();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("INDAGATE_STORAGE_ENGINE", "memory"),
            ("INDAGATE_SESSION_LENGTH_MINUTES", "15"),
            ("INDAGATE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = IndagateConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.storage.engine, StorageEngine::Memory);
        assert_eq!(config.auth.session_length_minutes, 15);
        assert_eq!(config.logging.level, "debug");

        let err = config
            .apply_overrides(|key| (key == "INDAGATE_STORAGE_ENGINE").then(|| "bolt".to_string()))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Invalid);
    }

    #[test]
    fn home_is_expanded() {
        let resolved = StorageConfig::default().resolved_path();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolved, home.join(".indagate/indagate.redb"));
        }
        assert_eq!(
            StorageConfig::redb("/tmp/x.redb").resolved_path(),
            PathBuf::from("/tmp/x.redb")
        );
    }
}
