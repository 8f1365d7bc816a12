use std::collections::BTreeMap;
use std::path::PathBuf;

use log::debug;

use crate::config::{ConfigKey, ConfigResolver, ConfigValue, EffectiveConfig};
use crate::error::ConfigError;
use crate::repl::Bindings;

pub const HELP: &str = "\
Type a request in plain English to get an ffmpeg command.
  !<command>          run a shell command (generated commands are prefilled)
  /help, /h, /?       show this help
  /ping               check connectivity to the LLM endpoint
  /reset              clear the conversation history
  /profile            show the active profile
  /profiles           list available profiles
  /config [sub]       inspect or change settings (/config help)
  /bindings vi|emacs  switch line editing mode
  /exit, /quit, /q    leave (also: exit, quit, logout, :q, :q!)";

pub const CONFIG_HELP: &str = "\
/config                     show the effective configuration
/config keys                list known keys
/config get <key>...        show selected keys
/config set <key=value>...  change settings for this session
/config unset <key>...      clear optional settings
/config reset               return to the startup configuration
/config save [path]         write non-secret settings to the config file
/config load [path]         apply settings from a config file";

/// Side effects requested by a handler, executed by the session in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Info(String),
    Warn(String),
    Error(String),
    /// Replace the live configuration; `summary` is shown once it commits.
    Apply {
        config: Box<EffectiveConfig>,
        summary: String,
    },
    ResetTranscript,
    Ping,
    ShowProfile,
    ListProfiles,
    SetBindings(Bindings),
    SaveConfig(Option<PathBuf>),
    LoadConfig(Option<PathBuf>),
    Exit,
}

/// What a handler sees. Handlers never mutate session state themselves.
pub struct CommandContext<'a> {
    pub config: &'a EffectiveConfig,
    pub startup: &'a EffectiveConfig,
    pub resolver: &'a ConfigResolver,
}

type Handler = fn(&[String], &CommandContext<'_>) -> Vec<Effect>;

const COMMANDS: &[(&str, Handler)] = &[
    ("help", help),
    ("h", help),
    ("?", help),
    ("ping", ping),
    ("reset", reset),
    ("profile", profile),
    ("profiles", profiles),
    ("config", config),
    ("bindings", bindings),
    ("exit", exit),
    ("quit", exit),
    ("q", exit),
    ("logout", exit),
    (":q", exit),
    (":q!", exit),
];

/// Runs a slash command. `line` is the input with the leading `/` removed.
pub fn dispatch(line: &str, ctx: &CommandContext<'_>) -> Vec<Effect> {
    let Some(words) = shlex::split(line) else {
        return vec![Effect::Error(format!("Unbalanced quotes in: /{line}"))];
    };
    let Some((verb, args)) = words.split_first() else {
        return help(&[], ctx);
    };

    let verb = verb.to_ascii_lowercase();
    debug!("Dispatching /{verb} with {} args", args.len());
    match COMMANDS.iter().find(|(name, _)| *name == verb) {
        Some((_, handler)) => handler(args, ctx),
        None => vec![Effect::Error(format!(
            "Unknown command: /{verb} (try /help)"
        ))],
    }
}

fn help(_: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    vec![Effect::Info(HELP.to_string())]
}

fn exit(_: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    vec![Effect::Exit]
}

fn ping(_: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    vec![Effect::Ping]
}

fn reset(_: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    vec![Effect::ResetTranscript]
}

fn profile(_: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    vec![Effect::ShowProfile]
}

fn profiles(_: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    vec![Effect::ListProfiles]
}

fn bindings(args: &[String], _: &CommandContext<'_>) -> Vec<Effect> {
    match args {
        [mode] => match mode.parse::<Bindings>() {
            Ok(bindings) => vec![Effect::SetBindings(bindings)],
            Err(e) => vec![Effect::Error(e)],
        },
        _ => vec![Effect::Error("Usage: /bindings vi|emacs".to_string())],
    }
}

// ============================================================================
// /config
// ============================================================================

fn config(args: &[String], ctx: &CommandContext<'_>) -> Vec<Effect> {
    let Some((sub, rest)) = args.split_first() else {
        return show(ctx.config);
    };

    match sub.to_ascii_lowercase().as_str() {
        "show" => show(ctx.config),
        "help" => vec![Effect::Info(CONFIG_HELP.to_string())],
        "keys" => keys(),
        "get" if rest.is_empty() => show(ctx.config),
        "get" => get(rest, ctx.config),
        "set" => set(rest, ctx),
        "unset" => unset(rest, ctx),
        "reset" => vec![Effect::Apply {
            config: Box::new(ctx.startup.clone()),
            summary: "Configuration reset to startup values".to_string(),
        }],
        "save" => vec![Effect::SaveConfig(optional_path(rest))],
        "load" => vec![Effect::LoadConfig(optional_path(rest))],
        other => vec![Effect::Error(format!(
            "Unknown /config subcommand: {other} (try /config help)"
        ))],
    }
}

fn show(config: &EffectiveConfig) -> Vec<Effect> {
    vec![Effect::Info(config.display_lines().join("\n"))]
}

fn keys() -> Vec<Effect> {
    let lines: Vec<String> = ConfigKey::ALL
        .into_iter()
        .map(|key| {
            let mut notes = Vec::new();
            if key.is_secret() {
                notes.push("secret, not saved");
            }
            if key.is_required() {
                notes.push("required");
            }
            if notes.is_empty() {
                key.to_string()
            } else {
                format!("{key} ({})", notes.join(", "))
            }
        })
        .collect();
    vec![Effect::Info(lines.join("\n"))]
}

fn get(names: &[String], config: &EffectiveConfig) -> Vec<Effect> {
    names
        .iter()
        .map(|name| match name.parse::<ConfigKey>() {
            Ok(key) => Effect::Info(format!("{key}={}", config.display_value(key))),
            Err(e) => Effect::Error(e.to_string()),
        })
        .collect()
}

/// Parses every pair, reporting and skipping bad ones, then applies the
/// rest as one change.
fn set(pairs: &[String], ctx: &CommandContext<'_>) -> Vec<Effect> {
    if pairs.is_empty() {
        return vec![Effect::Error("Usage: /config set <key=value>...".to_string())];
    }

    let mut effects = Vec::new();
    let mut overrides = BTreeMap::new();
    for pair in pairs {
        match parse_pair(pair) {
            Ok((key, value)) if key.is_required() && value == ConfigValue::Unset => {
                effects.push(Effect::Error(ConfigError::Required(key.to_string()).to_string()));
            }
            Ok((key, value)) => {
                overrides.insert(key, value);
            }
            Err(e) => effects.push(skipped(e)),
        }
    }

    effects.extend(apply(ctx, &overrides, "Updated"));
    effects
}

fn unset(names: &[String], ctx: &CommandContext<'_>) -> Vec<Effect> {
    if names.is_empty() {
        return vec![Effect::Error("Usage: /config unset <key>...".to_string())];
    }

    let mut effects = Vec::new();
    let mut overrides = BTreeMap::new();
    for name in names {
        match name.parse::<ConfigKey>() {
            Ok(key) if key.is_required() => {
                effects.push(Effect::Error(ConfigError::Required(key.to_string()).to_string()));
            }
            Ok(key) => {
                overrides.insert(key, ConfigValue::Unset);
            }
            Err(e) => effects.push(skipped(e)),
        }
    }

    effects.extend(apply(ctx, &overrides, "Unset"));
    effects
}

fn apply(
    ctx: &CommandContext<'_>,
    overrides: &BTreeMap<ConfigKey, ConfigValue>,
    verb: &str,
) -> Option<Effect> {
    if overrides.is_empty() {
        return None;
    }

    let names: Vec<&str> = overrides.keys().map(|key| key.as_str()).collect();
    Some(match ctx.resolver.apply(ctx.config, overrides) {
        Ok(next) => Effect::Apply {
            config: Box::new(next),
            summary: format!("{verb}: {}", names.join(", ")),
        },
        Err(e) => Effect::Error(e.to_string()),
    })
}

fn parse_pair(pair: &str) -> Result<(ConfigKey, ConfigValue), ConfigError> {
    let (name, raw) = pair
        .split_once('=')
        .ok_or_else(|| ConfigError::MalformedPair(pair.to_string()))?;
    let key: ConfigKey = name.parse()?;
    Ok((key, key.coerce(raw)?))
}

fn skipped(err: ConfigError) -> Effect {
    match err {
        ConfigError::UnknownKey(key) => Effect::Warn(format!("Skipping unknown config key: {key}")),
        other => Effect::Error(other.to_string()),
    }
}

fn optional_path(args: &[String]) -> Option<PathBuf> {
    args.first().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliOverrides, ConfigFile, Defaults, Environment, Provider, Secret};
    use pretty_assertions::assert_eq;

    struct Fixture {
        resolver: ConfigResolver,
        config: EffectiveConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let resolver = ConfigResolver::new(Defaults::default());
            let config = resolver
                .resolve(
                    &CliOverrides::default(),
                    &Environment::default(),
                    &ConfigFile::default(),
                )
                .unwrap();
            Self { resolver, config }
        }

        fn run(&self, line: &str) -> Vec<Effect> {
            let ctx = CommandContext {
                config: &self.config,
                startup: &self.config,
                resolver: &self.resolver,
            };
            dispatch(line, &ctx)
        }

        fn applied(&self, line: &str) -> EffectiveConfig {
            match self.run(line).pop() {
                Some(Effect::Apply { config, .. }) => *config,
                other => panic!("expected Apply, got {other:?}"),
            }
        }
    }

    #[test]
    fn dispatches_verbs_and_aliases() {
        let f = Fixture::new();
        assert_eq!(f.run("ping"), vec![Effect::Ping]);
        assert_eq!(f.run("RESET"), vec![Effect::ResetTranscript]);
        assert_eq!(f.run("?"), f.run("help"));
        assert_eq!(f.run(":q"), vec![Effect::Exit]);
        assert_eq!(f.run(":q!"), vec![Effect::Exit]);
        assert_eq!(f.run("bindings vi"), vec![Effect::SetBindings(Bindings::Vi)]);
    }

    #[test]
    fn unknown_verb_is_an_error() {
        let f = Fixture::new();
        assert!(matches!(f.run("frobnicate").as_slice(), [Effect::Error(msg)] if msg.contains("/frobnicate")));
    }

    #[test]
    fn set_switches_to_openai() {
        let f = Fixture::new();
        let next = f.applied("config set provider=openai api_key=sk-test");

        assert_eq!(next.provider, Provider::OpenAi);
        assert_eq!(next.base_url, None);
        assert_eq!(next.api_key, Some(Secret::new("sk-test")));
        assert!(f.config.transport_differs(&next));
    }

    #[test]
    fn set_reports_bad_pairs_and_applies_the_rest() {
        let f = Fixture::new();
        let effects = f.run("config set bogus=1 copy=maybe model=other context_turns=3");

        assert_eq!(effects.len(), 3);
        assert_eq!(
            effects[0],
            Effect::Warn("Skipping unknown config key: bogus".to_string())
        );
        assert!(matches!(&effects[1], Effect::Error(msg) if msg.contains("copy")));
        match &effects[2] {
            Effect::Apply { config, summary } => {
                assert_eq!(config.model, "other");
                assert_eq!(config.context_turns, 3);
                assert_eq!(summary, "Updated: context_turns, model");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_provider_is_skipped_like_other_bad_values() {
        let f = Fixture::new();
        let effects = f.run("config set provider=azure model=other");

        assert_eq!(effects.len(), 2);
        assert_eq!(
            effects[0],
            Effect::Error("Invalid value for provider: azure".to_string())
        );
        match &effects[1] {
            Effect::Apply { config, summary } => {
                assert_eq!(config.model, "other");
                assert_eq!(config.provider, f.config.provider);
                assert_eq!(summary, "Updated: model");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn set_handles_quoted_values() {
        let f = Fixture::new();
        let next = f.applied("config set 'model=llama3:8b instruct'");
        assert_eq!(next.model, "llama3:8b instruct");
    }

    #[test]
    fn base_url_selects_compatible_provider() {
        let mut f = Fixture::new();
        f.config.provider = Provider::OpenAi;
        f.config.base_url = None;
        f.config.api_key = Some(Secret::new("sk"));

        let next = f.applied("config set base_url=gpu-box:8000");
        assert_eq!(next.provider, Provider::Compatible);
        assert_eq!(next.base_url.as_deref(), Some("http://gpu-box:8000/v1"));
    }

    #[test]
    fn required_keys_cannot_be_unset() {
        let f = Fixture::new();
        assert_eq!(
            f.run("config unset model"),
            vec![Effect::Error("Cannot unset required key: model".to_string())]
        );
        assert_eq!(
            f.run("config set model=none"),
            vec![Effect::Error("Cannot unset required key: model".to_string())]
        );
    }

    #[test]
    fn unset_profile_restores_default() {
        let mut f = Fixture::new();
        f.config.profile_name = "examples".to_string();
        assert_eq!(f.applied("config unset profile").profile_name, "minimal");
    }

    #[test]
    fn get_masks_secrets() {
        let mut f = Fixture::new();
        f.config.bearer_token = Some(Secret::new("hunter2"));

        let effects = f.run("config get bearer_token openai_api_key model");
        assert_eq!(
            effects,
            vec![
                Effect::Info("bearer_token=(set)".to_string()),
                Effect::Info("openai_api_key=(unset)".to_string()),
                Effect::Info("model=gpt-oss:20b".to_string()),
            ]
        );
    }

    #[test]
    fn save_and_load_carry_optional_paths() {
        let f = Fixture::new();
        assert_eq!(f.run("config save"), vec![Effect::SaveConfig(None)]);
        assert_eq!(
            f.run("config load /tmp/alt.env"),
            vec![Effect::LoadConfig(Some(PathBuf::from("/tmp/alt.env")))]
        );
    }

    #[test]
    fn config_without_subcommand_shows_everything() {
        let f = Fixture::new();
        match f.run("config").as_slice() {
            [Effect::Info(text)] => {
                assert_eq!(text.lines().count(), ConfigKey::ALL.len());
                assert!(text.contains("openai_api_key=(unset)"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.run("config"), f.run("config get"));
    }
}
