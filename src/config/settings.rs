use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::ConfigKey;
use crate::error::ConfigError;

/// Path segment every OpenAI-compatible base URL ends with.
pub const API_VERSION_SUFFIX: &str = "/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Compatible,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Compatible => "compat",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "compat" | "compatible" => Ok(Provider::Compatible),
            _ => Err(ConfigError::InvalidValue {
                key: ConfigKey::Provider.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}

/// A credential. Its `Debug` output is masked and it has no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// The resolved settings used by a session. Changes produce a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub model: String,
    pub provider: Provider,
    /// Normalized endpoint; `None` when `provider` is OpenAI.
    pub base_url: Option<String>,
    pub api_key: Option<Secret>,
    pub bearer_token: Option<Secret>,
    pub profile_name: String,
    pub profile_dir: PathBuf,
    pub context_turns: usize,
    pub copy_on_generate: bool,
    pub nag_enabled: bool,
    pub preload_prompt: Option<String>,
    pub single_shot_prompt: Option<String>,
}

impl EffectiveConfig {
    /// True when switching from `self` to `other` needs a new network client.
    pub fn transport_differs(&self, other: &EffectiveConfig) -> bool {
        self.provider != other.provider
            || self.base_url != other.base_url
            || self.api_key != other.api_key
            || self.bearer_token != other.bearer_token
    }

    /// Value as written to the config file, `None` when absent or secret.
    pub fn persisted_value(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Model => Some(self.model.clone()),
            ConfigKey::Provider => Some(self.provider.to_string()),
            ConfigKey::BaseUrl => self.base_url.clone(),
            ConfigKey::ContextTurns => Some(self.context_turns.to_string()),
            ConfigKey::Profile => Some(self.profile_name.clone()),
            ConfigKey::NoNag => Some((!self.nag_enabled).to_string()),
            ConfigKey::Copy => Some(self.copy_on_generate.to_string()),
            ConfigKey::OpenaiApiKey | ConfigKey::BearerToken => None,
        }
    }

    /// Value for display to the user. Secrets render as `(set)`/`(unset)`.
    pub fn display_value(&self, key: ConfigKey) -> String {
        let masked = |secret: &Option<Secret>| {
            if secret.is_some() { "(set)" } else { "(unset)" }.to_string()
        };
        match key {
            ConfigKey::OpenaiApiKey => masked(&self.api_key),
            ConfigKey::BearerToken => masked(&self.bearer_token),
            other => self
                .persisted_value(other)
                .unwrap_or_else(|| "None".to_string()),
        }
    }

    /// `key=value` lines for every known key, secrets masked.
    pub fn display_lines(&self) -> Vec<String> {
        ConfigKey::ALL
            .into_iter()
            .map(|key| format!("{key}={}", self.display_value(key)))
            .collect()
    }
}

/// Prepends `http://` when no scheme is present, strips trailing slashes and
/// appends the API version segment if it is missing. Idempotent.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let kept = url.trim_end_matches('/').len();
    url.truncate(kept);

    if !url.ends_with(API_VERSION_SUFFIX) {
        url.push_str(API_VERSION_SUFFIX);
    }
    url
}
