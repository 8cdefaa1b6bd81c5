//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::application::errors::ConfigError;

pub const DEFAULT_HIPCHAT_HOST: &str = "chat.hipchat.com";
pub const DEFAULT_HIPCHAT_CONF_HOST: &str = "conf.hipchat.com";
pub const DEFAULT_HIPCHAT_RESOURCE: &str = "bot";

/// Robot configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub robot: RobotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RobotConfig {
    pub name: String,
    pub alias: String,
    pub adapter: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            name: "hal".to_string(),
            alias: String::new(),
            adapter: "shell".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Load `path` if present, falling back to defaults, then apply env overrides
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Ok(Config::load(path)?.with_env(env_var))
        } else {
            Ok(Config::load_env())
        }
    }

    pub fn load_env() -> Self {
        Config::default().with_env(env_var)
    }

    /// Apply `HAL_*` overrides read through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("HAL_NAME") {
            self.robot.name = name;
        }
        if let Some(alias) = lookup("HAL_ALIAS") {
            self.robot.alias = alias;
        }
        if let Some(adapter) = lookup("HAL_ADAPTER") {
            self.robot.adapter = adapter;
        }
        if let Some(level) = lookup("HAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        self
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }
}

/// HipChat adapter settings, read from `HAL_HIPCHAT_*` variables
#[derive(Debug, Clone, PartialEq)]
pub struct HipchatConfig {
    pub user: String,
    pub password: String,
    /// Room names to join; empty means every room
    pub rooms: Vec<String>,
    pub resource: String,
    pub host: String,
    pub conf_host: String,
}

impl HipchatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingField(key.to_string()))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            user: required("HAL_HIPCHAT_USER")?,
            password: required("HAL_HIPCHAT_PASSWORD")?,
            rooms: split_rooms(&lookup("HAL_HIPCHAT_ROOMS").unwrap_or_default()),
            resource: optional("HAL_HIPCHAT_RESOURCE", DEFAULT_HIPCHAT_RESOURCE),
            host: optional("HAL_HIPCHAT_HOST", DEFAULT_HIPCHAT_HOST),
            conf_host: optional("HAL_HIPCHAT_CONF_HOST", DEFAULT_HIPCHAT_CONF_HOST),
        })
    }
}

/// Split a comma-separated room list, dropping blank entries
pub fn split_rooms(rooms: &str) -> Vec<String> {
    rooms
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
