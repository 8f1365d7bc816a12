use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{ConfigKey, ConfigValue, EffectiveConfig};
use crate::error::ConfigError;

/// Flat `key=value` mapping read from a config file.
///
/// Unknown keys are collected in `unknown` instead of failing the load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub values: BTreeMap<ConfigKey, ConfigValue>,
    pub unknown: Vec<String>,
}

impl ConfigFile {
    /// Loads `path`. A missing file yields an empty mapping.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut file = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                debug!("Skipping config line without '=': {line}");
                continue;
            };

            match key.parse::<ConfigKey>() {
                Ok(key) => {
                    file.values.insert(key, key.coerce(value)?);
                }
                Err(_) => file.unknown.push(key.trim().to_string()),
            }
        }

        Ok(file)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Non-empty text value for `key`.
    pub fn text(&self, key: ConfigKey) -> Option<&str> {
        match self.values.get(&key) {
            Some(ConfigValue::Text(value)) if !value.trim().is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, key: ConfigKey) -> Option<usize> {
        match self.values.get(&key) {
            Some(ConfigValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bool(&self, key: ConfigKey) -> Option<bool> {
        match self.values.get(&key) {
            Some(ConfigValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Writes the persistable subset of `keys` as sorted `key=value` lines.
///
/// Secret keys are dropped even when requested, and keys whose value is
/// absent are omitted.
pub fn save(
    config: &EffectiveConfig,
    path: &Path,
    keys: &[ConfigKey],
) -> Result<PathBuf, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut keys: Vec<ConfigKey> = keys.iter().copied().filter(|k| k.is_persisted()).collect();
    keys.sort_by_key(|key| key.as_str());
    keys.dedup();

    let mut content = String::new();
    for key in keys {
        if let Some(value) = config.persisted_value(key) {
            content.push_str(&format!("{key}={value}\n"));
        }
    }

    fs::write(path, content).map_err(io_err)?;
    debug!("Saved configuration to {}", path.display());
    Ok(path.to_path_buf())
}
