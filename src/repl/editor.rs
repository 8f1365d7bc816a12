use anyhow::{Context, Result};
use log::{debug, warn};
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, EditMode};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::ConfigKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bindings {
    Emacs,
    Vi,
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bindings::Emacs => "emacs",
            Bindings::Vi => "vi",
        })
    }
}

impl FromStr for Bindings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emacs" => Ok(Bindings::Emacs),
            "vi" | "vim" => Ok(Bindings::Vi),
            other => Err(format!("Unknown bindings '{other}' (expected vi or emacs)")),
        }
    }
}

/// Terminal input for the REPL.
pub trait LineReader {
    /// Reads one line, with `prefill` already typed into the buffer.
    fn read_line(&mut self, prompt: &str, prefill: &str) -> Result<ReadOutcome>;

    fn set_bindings(&mut self, bindings: Bindings);
}

/// rustyline editor with a persistent history file.
pub struct RustylineReader {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl RustylineReader {
    pub fn new(history_path: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new().context("Failed to initialise line editor")?;
        editor.set_auto_add_history(false);

        if let Some(path) = &history_path {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    warn!("Failed to load history from {}: {e}", path.display());
                }
            }
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    fn record(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if carries_secret(line) {
            debug!("Not recording a command that sets a secret");
            return;
        }
        if let Err(e) = self.editor.add_history_entry(line) {
            warn!("Failed to record history entry: {e}");
            return;
        }
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.save_history(path) {
                warn!("Failed to save history to {}: {e}", path.display());
            }
        }
    }
}

impl LineReader for RustylineReader {
    fn read_line(&mut self, prompt: &str, prefill: &str) -> Result<ReadOutcome> {
        match self.editor.readline_with_initial(prompt, (prefill, "")) {
            Ok(line) => {
                self.record(&line);
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e).context("Failed to read input"),
        }
    }

    fn set_bindings(&mut self, bindings: Bindings) {
        debug!("Switching edit mode to {bindings}");
        self.editor.set_edit_mode(match bindings {
            Bindings::Emacs => EditMode::Emacs,
            Bindings::Vi => EditMode::Vi,
        });
    }
}

/// True for slash commands with a `key=value` word naming a secret key.
fn carries_secret(line: &str) -> bool {
    let Some(rest) = line.trim().strip_prefix('/') else {
        return false;
    };
    let words = shlex::split(rest)
        .unwrap_or_else(|| rest.split_whitespace().map(str::to_string).collect());
    words
        .iter()
        .filter_map(|word| word.split_once('='))
        .map(|(name, _)| name.trim_start_matches(['\'', '"']))
        .any(|name| name.parse::<ConfigKey>().is_ok_and(ConfigKey::is_secret))
}
