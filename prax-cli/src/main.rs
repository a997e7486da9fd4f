//! Prax Squash - compact migration history into one migration.

use clap::Parser;

use prax_squash_cli::cli::{Cli, Command};
use prax_squash_cli::commands;
use prax_squash_cli::error::CliResult;
use prax_squash_cli::output;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    prax_squash::logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Squash(args) => commands::squash::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
