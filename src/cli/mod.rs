pub mod args;
pub mod commands;
pub mod output;

pub use args::Cli;
pub use commands::{CommandHandler, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};
pub use output::{OutputFormatter, Spinner};
