use clap::Parser;
use log::debug;

use wtffmpeg::{Cli, CommandHandler, EXIT_FAILURE};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Warnings by default; RUST_LOG wins, --verbose opens up this crate
    let mut logger = env_logger::Builder::new();
    logger.filter_level(log::LevelFilter::Warn);
    if cli.verbose {
        logger.filter_module("wtffmpeg", log::LevelFilter::Debug);
    }
    logger.parse_default_env();
    logger.format_timestamp(None).init();

    let handler = CommandHandler::new(cli);
    let formatter = *handler.formatter();

    let code = match handler.run().await {
        Ok(code) => code,
        Err(e) => {
            debug!("Startup failed: {e:?}");
            eprintln!("{}", formatter.format_error(&format!("{e:#}")));
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
