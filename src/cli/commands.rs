use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io;
use std::path::PathBuf;

use crate::ai::{BackendFactory, HttpBackendFactory};
use crate::cli::{Cli, OutputFormatter};
use crate::config::{
    defaults, normalize_base_url, CliOverrides, ConfigFile, ConfigResolver, Defaults,
    EffectiveConfig, Environment, Provider,
};
use crate::profiles::ProfileStore;
use crate::repl::{generate, Collaborators, RustylineReader, Session, Transcript};
use crate::utils::{ClipboardSink, SystemClipboard, SystemShell};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Top-level runner: resolves configuration, then lists profiles, answers a
/// single prompt, or hands over to the interactive session.
pub struct CommandHandler {
    cli: Cli,
    resolver: ConfigResolver,
    formatter: OutputFormatter,
}

impl CommandHandler {
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            resolver: ConfigResolver::new(Defaults::default()),
            formatter: OutputFormatter::for_stdout(),
        }
    }

    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    /// Returns the process exit code.
    pub async fn run(self) -> Result<i32> {
        if self.cli.list_profiles {
            return Ok(self.list_profiles());
        }

        let config_path = self.cli.config.clone().unwrap_or_else(defaults::config_path);
        let file = ConfigFile::load(&config_path)?;
        for key in &file.unknown {
            warn!("Ignoring unknown key '{key}' in {}", config_path.display());
        }

        let overrides = CliOverrides::from(&self.cli);
        let config = self
            .resolver
            .resolve(&overrides, &Environment::from_process(), &file)
            .with_context(|| format!("Invalid configuration (config file {})", config_path.display()))?;
        debug!("Effective configuration: {config:?}");

        if self.uses_default_endpoint(&config) {
            eprintln!(
                "{}",
                self.formatter.format_info(&format!(
                    "No API key or WTFFMPEG_LLM_API_URL provided. Defaulting to local Ollama at {}",
                    defaults::BASE_URL
                ))
            );
        }

        match config.single_shot_prompt.clone() {
            Some(prompt) => self.single_shot(config, &prompt).await,
            None => self.interactive(config, config_path).await,
        }
    }

    fn list_profiles(&self) -> i32 {
        let profile_dir = self
            .cli
            .profile_dir
            .clone()
            .unwrap_or_else(defaults::profile_dir);
        let listing = ProfileStore::default().list(&profile_dir);

        println!("User profiles ({}):", profile_dir.display());
        for name in &listing.user {
            println!("  {name}");
        }
        println!("Built-in profiles:");
        for name in &listing.builtin {
            println!("  {name}");
        }
        EXIT_OK
    }

    fn uses_default_endpoint(&self, config: &EffectiveConfig) -> bool {
        config.provider == Provider::Compatible
            && config.bearer_token.is_none()
            && config.base_url.as_deref() == Some(normalize_base_url(defaults::BASE_URL).as_str())
    }

    async fn single_shot(&self, config: EffectiveConfig, prompt: &str) -> Result<i32> {
        if prompt.trim().is_empty() {
            eprintln!("{}", self.formatter.format_error("--prompt-once needs a non-empty prompt"));
            return Ok(EXIT_USAGE);
        }

        let profile = ProfileStore::default().resolve(&config.profile_name, &config.profile_dir)?;
        info!("Single-shot with profile {} ({})", profile.name, profile.source.as_str());
        let backend = HttpBackendFactory.build(&config)?;
        let transcript = Transcript::new(profile.text.as_str());

        let generation = match generate(backend.as_ref(), &transcript, prompt.trim(), &config).await {
            Ok(generation) => generation,
            Err(e) => {
                eprintln!("{}", self.formatter.format_error(&e.to_string()));
                eprintln!("Failed to generate a command.");
                return Ok(EXIT_FAILURE);
            }
        };

        if generation.command.is_empty() {
            eprintln!("Failed to generate a command.");
            println!("{}", generation.raw);
            return Ok(EXIT_FAILURE);
        }

        println!("{}", self.formatter.format_command(&generation.command));
        if config.copy_on_generate {
            match SystemClipboard::new().copy(&generation.command) {
                Ok(()) => eprintln!("Command copied to clipboard."),
                Err(e) => eprintln!("{}", self.formatter.format_warning(&format!("{e:#}"))),
            }
        }
        Ok(EXIT_OK)
    }

    async fn interactive(&self, config: EffectiveConfig, config_path: PathBuf) -> Result<i32> {
        let parts = Collaborators {
            factory: Box::new(HttpBackendFactory),
            reader: Box::new(RustylineReader::new(Some(defaults::history_path()))?),
            shell: Box::new(SystemShell),
            clipboard: Box::new(SystemClipboard::new()),
            out: Box::new(io::stdout()),
        };

        let mut session = Session::new(
            config,
            self.resolver.clone(),
            ProfileStore::default(),
            config_path,
            self.formatter,
            parts,
        )?;
        session.run().await?;
        Ok(EXIT_OK)
    }
}
