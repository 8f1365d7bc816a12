use std::path::PathBuf;

pub const MODEL_COMPAT: &str = "gpt-oss:20b";
pub const MODEL_OPENAI: &str = "gpt-4o";
pub const BASE_URL: &str = "http://localhost:11434";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const PROFILE_NAME: &str = "minimal";
pub const CONTEXT_TURNS: usize = 12;

const APP_DIR: &str = ".wtffmpeg";
const HISTORY_FILE: &str = ".wtff_history";

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.wtffmpeg`
pub fn app_dir() -> PathBuf {
    home_dir().join(APP_DIR)
}

pub fn config_path() -> PathBuf {
    app_dir().join("config.env")
}

pub fn profile_dir() -> PathBuf {
    app_dir().join("profiles")
}

pub fn history_path() -> PathBuf {
    home_dir().join(HISTORY_FILE)
}
