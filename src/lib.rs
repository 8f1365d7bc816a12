pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod profiles;
pub mod repl;
pub mod utils;

pub use cli::{Cli, CommandHandler, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};
pub use config::EffectiveConfig;
pub use error::{ConfigError, LlmError, ProfileError};
pub use repl::Session;
