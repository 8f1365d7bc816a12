use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use log::debug;

use crate::config::keys::clamp_turns;
use crate::config::{
    defaults, normalize_base_url, ConfigFile, ConfigKey, ConfigValue, EffectiveConfig, Provider,
    Secret,
};
use crate::error::ConfigError;

pub const ENV_MODEL: &str = "WTFFMPEG_MODEL";
pub const ENV_API_KEY: &str = "WTFFMPEG_OPENAI_API_KEY";
pub const ENV_BEARER_TOKEN: &str = "WTFFMPEG_BEARER_TOKEN";
pub const ENV_URL: &str = "WTFFMPEG_LLM_API_URL";
pub const ENV_PROFILE: &str = "WTFFMPEG_PROFILE";
pub const ENV_PROVIDER: &str = "WTFFMPEG_PROVIDER";

/// Values supplied on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub url: Option<String>,
    pub provider: Option<String>,
    pub profile: Option<String>,
    pub profile_dir: Option<PathBuf>,
    pub context_turns: Option<i64>,
    pub copy: bool,
    pub no_nag: bool,
    pub preload_prompt: Option<String>,
    pub single_shot_prompt: Option<String>,
}

/// Snapshot of the process environment, taken once.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Variables that are not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self::from_pairs(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value of `name`, `None` when unset or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        nonempty(self.vars.get(name).map(String::as_str))
    }
}

/// Built-in values used when no other source supplies a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub model_compat: String,
    pub model_openai: String,
    pub base_url: String,
    pub profile_name: String,
    pub profile_dir: PathBuf,
    pub context_turns: usize,
    pub copy_on_generate: bool,
    pub nag_enabled: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model_compat: defaults::MODEL_COMPAT.to_string(),
            model_openai: defaults::MODEL_OPENAI.to_string(),
            base_url: defaults::BASE_URL.to_string(),
            profile_name: defaults::PROFILE_NAME.to_string(),
            profile_dir: defaults::profile_dir(),
            context_turns: defaults::CONTEXT_TURNS,
            copy_on_generate: false,
            nag_enabled: true,
        }
    }
}

impl Defaults {
    pub fn model_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.model_openai,
            Provider::Compatible => &self.model_compat,
        }
    }
}

/// Merges command line, environment, config file and defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    defaults: Defaults,
}

impl ConfigResolver {
    pub fn new(defaults: Defaults) -> Self {
        Self { defaults }
    }

    /// Resolves every field with CLI > environment > file > default
    /// precedence. Blank values fall through to the next source.
    pub fn resolve(
        &self,
        cli: &CliOverrides,
        env: &Environment,
        file: &ConfigFile,
    ) -> Result<EffectiveConfig, ConfigError> {
        let d = &self.defaults;

        let api_key = first_of([
            nonempty(cli.api_key.as_deref()),
            env.get(ENV_API_KEY),
            file.text(ConfigKey::OpenaiApiKey),
        ]);
        let bearer_token = first_of([
            nonempty(cli.bearer_token.as_deref()),
            env.get(ENV_BEARER_TOKEN),
            file.text(ConfigKey::BearerToken),
        ]);
        let explicit_url = first_of([
            nonempty(cli.url.as_deref()),
            env.get(ENV_URL),
            file.text(ConfigKey::BaseUrl),
        ]);
        let explicit_provider = first_of([
            nonempty(cli.provider.as_deref()),
            env.get(ENV_PROVIDER),
            file.text(ConfigKey::Provider),
        ]);

        let provider = match explicit_provider {
            Some(raw) => raw.parse()?,
            None if api_key.is_some() && explicit_url.is_none() => Provider::OpenAi,
            None => Provider::Compatible,
        };
        debug!(
            "Provider resolved to {provider} (explicit: {})",
            explicit_provider.is_some()
        );

        let base_url = match provider {
            Provider::OpenAi => None,
            Provider::Compatible => Some(normalize_base_url(explicit_url.unwrap_or(&d.base_url))),
        };

        let model = first_of([
            nonempty(cli.model.as_deref()),
            env.get(ENV_MODEL),
            file.text(ConfigKey::Model),
        ])
        .unwrap_or(d.model_for(provider))
        .to_string();

        let profile_name = first_of([
            nonempty(cli.profile.as_deref()),
            env.get(ENV_PROFILE),
            file.text(ConfigKey::Profile),
        ])
        .unwrap_or(&d.profile_name)
        .to_string();

        let context_turns = cli
            .context_turns
            .map(clamp_turns)
            .or_else(|| file.int(ConfigKey::ContextTurns))
            .unwrap_or(d.context_turns);

        let copy_on_generate = if cli.copy {
            true
        } else {
            file.bool(ConfigKey::Copy).unwrap_or(d.copy_on_generate)
        };

        let nag_enabled = if cli.no_nag {
            false
        } else {
            file.bool(ConfigKey::NoNag)
                .map(|no_nag| !no_nag)
                .unwrap_or(d.nag_enabled)
        };

        Ok(EffectiveConfig {
            model,
            provider,
            base_url,
            api_key: api_key.map(Secret::new),
            bearer_token: bearer_token.map(Secret::new),
            profile_name,
            profile_dir: cli.profile_dir.clone().unwrap_or_else(|| d.profile_dir.clone()),
            context_turns,
            copy_on_generate,
            nag_enabled,
            preload_prompt: nonempty(cli.preload_prompt.as_deref()).map(str::to_string),
            single_shot_prompt: cli.single_shot_prompt.clone(),
        })
    }

    /// Applies coerced overrides onto `base`, producing a new configuration.
    ///
    /// Setting `base_url` without `provider` selects the compatible provider.
    /// The OpenAI provider never carries a base URL; the compatible provider
    /// always does, falling back to the default endpoint.
    pub fn apply(
        &self,
        base: &EffectiveConfig,
        overrides: &BTreeMap<ConfigKey, ConfigValue>,
    ) -> Result<EffectiveConfig, ConfigError> {
        let mut next = base.clone();

        for (&key, value) in overrides {
            match (key, value) {
                (key, ConfigValue::Unset) if key.is_required() => {
                    return Err(ConfigError::Required(key.to_string()));
                }
                (ConfigKey::Model, ConfigValue::Text(model)) => next.model = model.clone(),
                (ConfigKey::Provider, ConfigValue::Text(raw)) => next.provider = raw.parse()?,
                (ConfigKey::BaseUrl, ConfigValue::Text(url)) => {
                    next.base_url = Some(normalize_base_url(url));
                }
                (ConfigKey::BaseUrl, ConfigValue::Unset) => next.base_url = None,
                (ConfigKey::OpenaiApiKey, ConfigValue::Text(key)) => {
                    next.api_key = Some(Secret::new(key.as_str()));
                }
                (ConfigKey::OpenaiApiKey, ConfigValue::Unset) => next.api_key = None,
                (ConfigKey::BearerToken, ConfigValue::Text(token)) => {
                    next.bearer_token = Some(Secret::new(token.as_str()));
                }
                (ConfigKey::BearerToken, ConfigValue::Unset) => next.bearer_token = None,
                (ConfigKey::ContextTurns, ConfigValue::Int(turns)) => next.context_turns = *turns,
                (ConfigKey::Copy, ConfigValue::Bool(copy)) => next.copy_on_generate = *copy,
                (ConfigKey::NoNag, ConfigValue::Bool(no_nag)) => next.nag_enabled = !*no_nag,
                (ConfigKey::Profile, ConfigValue::Text(name)) => next.profile_name = name.clone(),
                (ConfigKey::Profile, ConfigValue::Unset) => {
                    next.profile_name = self.defaults.profile_name.clone();
                }
                (key, value) => {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: format!("{value:?}"),
                    });
                }
            }
        }

        let url_given = matches!(overrides.get(&ConfigKey::BaseUrl), Some(ConfigValue::Text(_)));
        if url_given && !overrides.contains_key(&ConfigKey::Provider) {
            next.provider = Provider::Compatible;
        }
        match next.provider {
            Provider::OpenAi => next.base_url = None,
            Provider::Compatible if next.base_url.is_none() => {
                next.base_url = Some(normalize_base_url(&self.defaults.base_url));
            }
            Provider::Compatible => {}
        }

        Ok(next)
    }
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn first_of<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates.into_iter().flatten().next()
}
