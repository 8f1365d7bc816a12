use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Bad boolean for {key}: {value}")]
    InvalidBool { key: String, value: String },

    #[error("Bad integer for {key}: {value}")]
    InvalidInt { key: String, value: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Cannot unset required key: {0}")]
    Required(String),

    #[error("Expected key=value, got: {0}")]
    MalformedPair(String),

    #[error("Provider 'openai' needs an API key (--api-key, WTFFMPEG_OPENAI_API_KEY or openai_api_key)")]
    MissingApiKey,

    #[error("Failed to access config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Empty profile spec")]
    EmptySpec,

    #[error("Profile file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Profile path is not a regular file: {}", .path.display())]
    NotRegularFile { path: PathBuf },

    #[error("Profile file too large ({size} bytes, limit {limit}): {}", .path.display())]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("Failed to read profile {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Profile '{spec}' not found. User profiles in {}: {}; Built-ins: {}.",
        .profile_dir.display(),
        list_or_none(.user),
        list_or_none(.builtin)
    )]
    Unknown {
        spec: String,
        profile_dir: PathBuf,
        user: Vec<String>,
        builtin: Vec<String>,
    },
}

/// Failures talking to the chat-completions endpoint.
///
/// Messages carry the target URL but never credentials.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Cannot reach LLM endpoint {target}: {cause}")]
    Connectivity { target: String, cause: String },

    #[error("LLM endpoint {target} returned {status}: {body}")]
    Status {
        target: String,
        status: u16,
        body: String,
    },

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Malformed response from {target}: {cause}")]
    Decode { target: String, cause: String },
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Renders an error followed by every `source()` below it, joined with `: `.
pub fn cause_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        let text = source.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = source.source();
    }
    parts.join(": ")
}
