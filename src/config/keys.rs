use std::fmt;
use std::str::FromStr;

use crate::config::Provider;
use crate::error::ConfigError;

/// The closed set of keys accepted from the config file and `/config`.
///
/// Variants are declared in alphabetical order of their names so that
/// ordered collections keyed by `ConfigKey` iterate sorted by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    BaseUrl,
    BearerToken,
    ContextTurns,
    Copy,
    Model,
    NoNag,
    OpenaiApiKey,
    Profile,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Int,
    Bool,
    Provider,
}

/// A coerced value for a known key. `Unset` comes from `none`/`null` or an
/// empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Text(String),
    Int(usize),
    Bool(bool),
    Unset,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::BaseUrl,
        ConfigKey::BearerToken,
        ConfigKey::ContextTurns,
        ConfigKey::Copy,
        ConfigKey::Model,
        ConfigKey::NoNag,
        ConfigKey::OpenaiApiKey,
        ConfigKey::Profile,
        ConfigKey::Provider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::BaseUrl => "base_url",
            ConfigKey::BearerToken => "bearer_token",
            ConfigKey::ContextTurns => "context_turns",
            ConfigKey::Copy => "copy",
            ConfigKey::Model => "model",
            ConfigKey::NoNag => "no_nag",
            ConfigKey::OpenaiApiKey => "openai_api_key",
            ConfigKey::Profile => "profile",
            ConfigKey::Provider => "provider",
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(self, ConfigKey::OpenaiApiKey | ConfigKey::BearerToken)
    }

    /// Keys written by `save`. Secrets are never persisted.
    pub fn is_persisted(self) -> bool {
        !self.is_secret()
    }

    /// Keys that must always hold a value and cannot be unset.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            ConfigKey::Model
                | ConfigKey::Provider
                | ConfigKey::ContextTurns
                | ConfigKey::Copy
                | ConfigKey::NoNag
        )
    }

    pub fn persisted() -> impl Iterator<Item = ConfigKey> {
        Self::ALL.into_iter().filter(|key| key.is_persisted())
    }

    fn kind(self) -> ValueKind {
        match self {
            ConfigKey::ContextTurns => ValueKind::Int,
            ConfigKey::Copy | ConfigKey::NoNag => ValueKind::Bool,
            ConfigKey::Provider => ValueKind::Provider,
            _ => ValueKind::Text,
        }
    }

    /// Coerces a raw string into the typed value for this key.
    pub fn coerce(self, raw: &str) -> Result<ConfigValue, ConfigError> {
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("null")
        {
            return Ok(ConfigValue::Unset);
        }

        match self.kind() {
            ValueKind::Text => Ok(ConfigValue::Text(value.to_string())),
            ValueKind::Int => parse_turns(self, value).map(ConfigValue::Int),
            ValueKind::Bool => parse_bool(self, value).map(ConfigValue::Bool),
            ValueKind::Provider => value
                .parse::<Provider>()
                .map(|provider| ConfigValue::Text(provider.to_string())),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        if name == "api_key" {
            return Ok(ConfigKey::OpenaiApiKey);
        }
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))
    }
}

pub fn parse_bool(key: ConfigKey, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Negative turn counts mean "stateless" and clamp to zero.
fn parse_turns(key: ConfigKey, raw: &str) -> Result<usize, ConfigError> {
    raw.parse::<i64>()
        .map(clamp_turns)
        .map_err(|_| ConfigError::InvalidInt {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

pub fn clamp_turns(turns: i64) -> usize {
    usize::try_from(turns.max(0)).unwrap_or(usize::MAX)
}
