use std::process::ExitCode;

use bls_ingestor::{
    cli::{self, Cli},
    config::load_config,
};
use clap::Parser;
use shared_utils::logging::init_tracing;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(cli.log.as_deref().unwrap_or(&cfg.logging.level));

    match cli::run(&cli, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}
