use clap::Parser;
use std::path::PathBuf;

use crate::config::CliOverrides;

#[derive(Parser, Debug)]
#[command(name = "wtff")]
#[command(about = "Turn plain-English requests into ffmpeg commands using an LLM")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct Cli {
    /// Request to run once before entering the interactive prompt
    pub prompt: Option<String>,

    /// Generate one command for this request, print it and exit
    #[arg(short = 'p', long = "prompt-once", value_name = "PROMPT")]
    pub prompt_once: Option<String>,

    /// Model name to request
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI API key (selects the OpenAI provider unless --url is given)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Bearer token for an OpenAI-compatible endpoint
    #[arg(long)]
    pub bearer_token: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    pub url: Option<String>,

    /// Provider: openai or compat
    #[arg(long)]
    pub provider: Option<String>,

    /// Copy each generated command to the clipboard
    #[arg(short, long)]
    pub copy: bool,

    /// Hide the usage reminder shown when the prompt starts
    #[arg(long)]
    pub no_nag: bool,

    /// Number of user/assistant turns kept as context
    #[arg(long, allow_negative_numbers = true)]
    pub context_turns: Option<i64>,

    /// Profile name or path to a profile file
    #[arg(long)]
    pub profile: Option<String>,

    /// Directory holding user profiles
    #[arg(long, value_name = "DIR")]
    pub profile_dir: Option<PathBuf>,

    /// List available profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Config file to read and save
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Accepted for compatibility; interactive mode is the default
    #[arg(short, long, hide = true)]
    pub interactive: bool,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            model: cli.model.clone(),
            api_key: cli.api_key.clone(),
            bearer_token: cli.bearer_token.clone(),
            url: cli.url.clone(),
            provider: cli.provider.clone(),
            profile: cli.profile.clone(),
            profile_dir: cli.profile_dir.clone(),
            context_turns: cli.context_turns,
            copy: cli.copy,
            no_nag: cli.no_nag,
            preload_prompt: cli.prompt.clone(),
            single_shot_prompt: cli.prompt_once.clone(),
        }
    }
}
