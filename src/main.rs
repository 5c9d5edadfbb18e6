use clap::Parser;
use log::{error, LevelFilter};
use std::process;

use trusty_poll::commands::{self, Cli};
use trusty_poll::config::Config;
use trusty_poll::ErrorKind;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let config = Config::from_env();

    if let Err(e) = commands::run(cli.command, &config).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(match e.kind() {
            ErrorKind::Malformed => 2,
            ErrorKind::Stale => 3,
            ErrorKind::Storage => 1,
        });
    }
}
