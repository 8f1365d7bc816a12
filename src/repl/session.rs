use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ai::{extract_command, shell_escape_form, BackendFactory, ChatBackend, Usage};
use crate::cli::{OutputFormatter, Spinner};
use crate::config::{save, ConfigFile, ConfigKey, ConfigResolver, ConfigValue, EffectiveConfig};
use crate::error::LlmError;
use crate::profiles::{Profile, ProfileStore};
use crate::repl::commands::{self, CommandContext, Effect};
use crate::repl::{Bindings, LineReader, ReadOutcome, Transcript};
use crate::utils::{ClipboardSink, ShellRunner};

pub const PROMPT: &str = "wtff> ";

const EXIT_KEYWORDS: [&str; 5] = ["exit", "quit", "logout", ":q", ":q!"];

const NAG: &str = "Press enter to execute the command at your prompt immediately or edit it \
as needed. You can also copy/paste it elsewhere. To run shell commands directly, prefix with ! \
(e.g. !ls -la). Remove this reminder with --no-nag or /config set no_nag=true.";

/// How one input line is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Empty,
    Exit,
    Slash(&'a str),
    Shell(&'a str),
    Prompt(&'a str),
}

pub fn classify(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Empty;
    }
    if EXIT_KEYWORDS.iter().any(|kw| line.eq_ignore_ascii_case(kw)) {
        return LineKind::Exit;
    }
    if let Some(rest) = line.strip_prefix('/') {
        return LineKind::Slash(rest.trim());
    }
    if let Some(rest) = line.strip_prefix('!') {
        let rest = rest.trim();
        return if rest.is_empty() {
            LineKind::Empty
        } else {
            LineKind::Shell(rest)
        };
    }
    LineKind::Prompt(line)
}

/// Outcome of one request: the reply as received and the command pulled
/// from it. An empty `command` is a failed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub raw: String,
    pub command: String,
    pub usage: Option<Usage>,
}

/// Sends the windowed transcript plus `prompt` and sanitizes the reply.
/// The transcript is left untouched.
pub async fn generate(
    backend: &dyn ChatBackend,
    transcript: &Transcript,
    prompt: &str,
    config: &EffectiveConfig,
) -> Result<Generation, LlmError> {
    let request = transcript.request_with(prompt, config.context_turns);
    let completion = backend.complete(&request, &config.model).await?;
    let command = extract_command(&completion.raw);
    if let Some(usage) = &completion.usage {
        debug!(
            "Token usage: {} prompt, {} completion",
            usage.prompt_tokens, usage.completion_tokens
        );
    }

    Ok(Generation {
        raw: completion.raw,
        command,
        usage: completion.usage,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Everything the session talks to outside its own state.
pub struct Collaborators {
    pub factory: Box<dyn BackendFactory>,
    pub reader: Box<dyn LineReader>,
    pub shell: Box<dyn ShellRunner>,
    pub clipboard: Box<dyn ClipboardSink>,
    pub out: Box<dyn Write>,
}

/// The interactive loop. Owns the live configuration, the transcript and
/// the network client; all three are replaced wholesale on change.
pub struct Session {
    config: EffectiveConfig,
    startup: EffectiveConfig,
    resolver: ConfigResolver,
    profiles: ProfileStore,
    profile: Arc<Profile>,
    transcript: Transcript,
    backend: Box<dyn ChatBackend>,
    client_generation: u64,
    config_path: PathBuf,
    prefill: String,
    formatter: OutputFormatter,
    factory: Box<dyn BackendFactory>,
    reader: Box<dyn LineReader>,
    shell: Box<dyn ShellRunner>,
    clipboard: Box<dyn ClipboardSink>,
    out: Box<dyn Write>,
}

impl Session {
    pub fn new(
        config: EffectiveConfig,
        resolver: ConfigResolver,
        mut profiles: ProfileStore,
        config_path: PathBuf,
        formatter: OutputFormatter,
        parts: Collaborators,
    ) -> Result<Self> {
        let profile = profiles.resolve(&config.profile_name, &config.profile_dir)?;
        let backend = parts.factory.build(&config)?;
        info!(
            "Session started with profile {} ({}) against {}",
            profile.name,
            profile.source.as_str(),
            backend.target()
        );

        Ok(Self {
            startup: config.clone(),
            transcript: Transcript::new(profile.text.as_str()),
            config,
            resolver,
            profiles,
            profile,
            backend,
            client_generation: 1,
            config_path,
            prefill: String::new(),
            formatter,
            factory: parts.factory,
            reader: parts.reader,
            shell: parts.shell,
            clipboard: parts.clipboard,
            out: parts.out,
        })
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Bumped every time the network client is rebuilt.
    pub fn client_generation(&self) -> u64 {
        self.client_generation
    }

    pub fn prefill(&self) -> &str {
        &self.prefill
    }

    pub async fn run(&mut self) -> Result<()> {
        self.say("Entering interactive mode. Type 'exit'/'quit' to leave. Use !<cmd> to run shell commands.");
        if self.config.nag_enabled {
            self.say(NAG);
        }

        if let Some(preload) = self.config.preload_prompt.clone() {
            self.generate_turn(&preload).await;
        }

        loop {
            let status = self.formatter.format_status(&self.status_line());
            self.say(&status);

            let prefill = std::mem::take(&mut self.prefill);
            let line = match self.reader.read_line(PROMPT, &prefill)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted | ReadOutcome::Eof => break,
            };

            if self.handle_line(&line).await == Flow::Exit {
                break;
            }
        }

        self.say("Exiting interactive mode.");
        Ok(())
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} | {} | copy {}",
            self.profile.name,
            self.config.model,
            if self.config.copy_on_generate { "on" } else { "off" }
        )
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        match classify(line) {
            LineKind::Empty => Flow::Continue,
            LineKind::Exit => Flow::Exit,
            LineKind::Slash(rest) => self.slash(rest).await,
            LineKind::Shell(command) => {
                self.shell_escape(command).await;
                Flow::Continue
            }
            LineKind::Prompt(prompt) => {
                self.generate_turn(prompt).await;
                Flow::Continue
            }
        }
    }

    // ========================================================================
    // Generation
    // ========================================================================

    async fn generate_turn(&mut self, prompt: &str) {
        let spinner = Spinner::attended("Thinking...");
        let result = generate(self.backend.as_ref(), &self.transcript, prompt, &self.config).await;
        if let Some(spinner) = spinner {
            spinner.stop();
        }

        let generation = match result {
            Ok(generation) if !generation.command.is_empty() => generation,
            Ok(generation) => {
                self.error("Failed to generate a command.");
                if !generation.raw.is_empty() {
                    self.say(&generation.raw);
                }
                return;
            }
            Err(e) => {
                self.error(&e.to_string());
                self.error("Failed to generate a command.");
                return;
            }
        };

        self.transcript
            .commit(prompt, &generation.raw, self.config.context_turns);
        debug!("Transcript holds {} messages", self.transcript.messages().len());

        if self.config.copy_on_generate {
            match self.clipboard.copy(&generation.command) {
                Ok(()) => self.info("Command copied to clipboard."),
                Err(e) => {
                    warn!("Clipboard copy failed: {e:#}");
                    self.warn(&format!("{e:#}"));
                }
            }
        }
        self.prefill = shell_escape_form(&generation.command);
    }

    async fn shell_escape(&mut self, command: &str) {
        match self.shell.run(command).await {
            Ok(0) => {}
            Ok(code) => self.error(&format!("Shell command exited {code}")),
            Err(e) => self.error(&format!("{e:#}")),
        }
    }

    // ========================================================================
    // Slash commands
    // ========================================================================

    async fn slash(&mut self, rest: &str) -> Flow {
        let effects = {
            let ctx = CommandContext {
                config: &self.config,
                startup: &self.startup,
                resolver: &self.resolver,
            };
            commands::dispatch(rest, &ctx)
        };

        for effect in effects {
            if self.execute(effect).await == Flow::Exit {
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    async fn execute(&mut self, effect: Effect) -> Flow {
        match effect {
            Effect::Info(text) => self.say(&text),
            Effect::Warn(text) => self.warn(&text),
            Effect::Error(text) => self.error(&text),
            Effect::Apply { config, summary } => match self.apply_config(*config) {
                Ok(()) => self.success(&summary),
                Err(e) => self.error(&format!("Change rejected: {e:#}")),
            },
            Effect::ResetTranscript => {
                self.transcript.reset();
                self.say("Conversation history cleared.");
            }
            Effect::Ping => match self.backend.ping().await {
                Ok(()) => self.success("LLM connectivity: OK"),
                Err(e) => self.error(&e.to_string()),
            },
            Effect::ShowProfile => self.show_profile(),
            Effect::ListProfiles => self.list_profiles(),
            Effect::SetBindings(bindings) => self.set_bindings(bindings),
            Effect::SaveConfig(path) => self.save_config(path),
            Effect::LoadConfig(path) => self.load_config(path),
            Effect::Exit => return Flow::Exit,
        }
        Flow::Continue
    }

    /// Commits `next` as the live configuration. A changed profile is
    /// resolved and a changed transport gets a new client first; if either
    /// fails nothing is replaced.
    pub fn apply_config(&mut self, next: EffectiveConfig) -> Result<()> {
        let profile = if next.profile_name != self.config.profile_name
            || next.profile_dir != self.config.profile_dir
        {
            Some(
                self.profiles
                    .resolve(&next.profile_name, &next.profile_dir)?,
            )
        } else {
            None
        };

        let backend = if self.config.transport_differs(&next) {
            Some(
                self.factory
                    .build(&next)
                    .context("Failed to build client for new settings")?,
            )
        } else {
            None
        };

        if let Some(profile) = profile {
            info!("Switched to profile {} ({})", profile.name, profile.source.as_str());
            self.transcript.set_instructions(profile.text.as_str());
            self.profile = profile;
        }
        if let Some(backend) = backend {
            self.client_generation += 1;
            info!(
                "Rebuilt client #{} for {}",
                self.client_generation,
                backend.target()
            );
            self.backend = backend;
        }
        self.config = next;
        self.transcript = self.transcript.trimmed(self.config.context_turns);
        Ok(())
    }

    fn show_profile(&mut self) {
        let location = match &self.profile.path {
            Some(path) => format!("{}, {}", self.profile.source.as_str(), path.display()),
            None => self.profile.source.as_str().to_string(),
        };
        let text = format!(
            "Current profile: {} ({location})\n{}",
            self.profile.name, self.profile.text
        );
        self.say(&text);
    }

    fn list_profiles(&mut self) {
        let listing = self.profiles.list(&self.config.profile_dir);
        let mut text = format!("User profiles ({}):", self.config.profile_dir.display());
        for name in &listing.user {
            text.push_str(&format!("\n  {name}"));
        }
        text.push_str("\nBuilt-in profiles:");
        for name in &listing.builtin {
            text.push_str(&format!("\n  {name}"));
        }
        self.say(&text);
    }

    fn set_bindings(&mut self, bindings: Bindings) {
        self.reader.set_bindings(bindings);
        let label = match bindings {
            Bindings::Vi => "Vi",
            Bindings::Emacs => "Emacs",
        };
        self.say(&format!("Switched to {label} mode."));
    }

    fn save_config(&mut self, path: Option<PathBuf>) {
        let path = path.unwrap_or_else(|| self.config_path.clone());
        let keys: Vec<ConfigKey> = ConfigKey::persisted().collect();
        match save(&self.config, &path, &keys) {
            Ok(path) => self.success(&format!("Saved configuration to {}", path.display())),
            Err(e) => self.error(&e.to_string()),
        }
    }

    fn load_config(&mut self, path: Option<PathBuf>) {
        let path = path.unwrap_or_else(|| self.config_path.clone());
        if let Err(e) = self.try_load_config(&path) {
            self.error(&format!("{e:#}"));
        }
    }

    fn try_load_config(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("No config file at {}", path.display());
        }
        let mut file = ConfigFile::load(path)?;
        for key in &file.unknown {
            self.warn(&format!("Skipping unknown config key: {key}"));
        }

        let required_unset: Vec<ConfigKey> = file
            .values
            .iter()
            .filter(|(key, value)| key.is_required() && **value == ConfigValue::Unset)
            .map(|(key, _)| *key)
            .collect();
        for key in required_unset {
            self.warn(&format!("Ignoring empty value for required key: {key}"));
            file.values.remove(&key);
        }

        if file.is_empty() {
            self.warn(&format!("No settings found in {}", path.display()));
            return Ok(());
        }

        let next = self.resolver.apply(&self.config, &file.values)?;
        self.apply_config(next)?;
        self.success(&format!("Loaded configuration from {}", path.display()));
        Ok(())
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn say(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn info(&mut self, text: &str) {
        let line = self.formatter.format_info(text);
        self.say(&line);
    }

    fn success(&mut self, text: &str) {
        let line = self.formatter.format_success(text);
        self.say(&line);
    }

    fn warn(&mut self, text: &str) {
        let line = self.formatter.format_warning(text);
        self.say(&line);
    }

    fn error(&mut self, text: &str) {
        let line = self.formatter.format_error(text);
        self.say(&line);
    }
}
