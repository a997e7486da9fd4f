//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Prax Squash - compact migration history into one migration
#[derive(Parser, Debug)]
#[command(name = "prax-squash")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Prax Squash - compact migration history into one migration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Squash old migrations into one synthesized migration
    Squash(SquashArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Squash Command
// =============================================================================

/// Arguments for the `squash` command
#[derive(Args, Debug, Default)]
pub struct SquashArgs {
    /// Only squash migrations created before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub before: Option<String>,

    /// Number of most recent migrations to keep
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub keep: Option<i64>,

    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip copying retired migrations to the backup directory
    #[arg(long)]
    pub no_backup: bool,

    /// Replace retired rows in the migrations table with one squashed row
    #[arg(long)]
    pub delete_records: bool,

    /// Migrations directory
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// Database schema to introspect
    #[arg(long, value_name = "NAME")]
    pub schema: Option<String>,

    /// Table to leave out of the squashed migration (repeatable)
    #[arg(long = "exclude", value_name = "TABLE")]
    pub exclude: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,

    /// Print the plan or report as JSON
    #[arg(long)]
    pub json: bool,
}
