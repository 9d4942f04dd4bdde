// browserstore - embedded SQL storage engine
//
// Thin CLI wrapper around the library crate: parses a subcommand, builds an
// engine from config, runs the operation, and exits. No UI, no IPC — those
// are external collaborators of this crate, not part of it.

use browserstore::cli::{self, Cli};
use browserstore::config::EngineConfig;
use browserstore::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    EngineConfig::ensure_config_exists().ok();
    logging::init(logging::default_filter());

    cli::run(cli).await
}
