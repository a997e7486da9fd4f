//! `prax-squash squash` command - compact old migrations.

use std::sync::Arc;

use prax_squash::{Dialect, SquashError, SquashPlan, SquashReport, Squasher, catalog, parse_cutoff};

use crate::cli::SquashArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv, success};

/// Run the squash command
pub async fn run(args: SquashArgs) -> CliResult<()> {
    // The date is checked before anything is read.
    let cutoff = args.before.as_deref().map(parse_cutoff).transpose()?;

    let cwd = std::env::current_dir()?;
    let file = Config::load_or_default(&cwd)?;
    let config = file.resolve(&args, cutoff, &cwd)?;

    if !args.json {
        output::header("Squash Migrations");
        kv("Migrations", &config.migrations_dir.display().to_string());
        kv("Cutoff", &config.cutoff.to_string());
        kv("Keep", &config.keep.to_string());
        output::newline();
    }

    let plan = prax_squash::plan(&config).await?;

    if args.json && (args.dry_run || plan.is_empty()) {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.is_empty() {
        output::info("Nothing to squash");
        return Ok(());
    }

    if !args.json {
        print_plan(&plan);
    }

    if args.dry_run {
        output::dim("Dry run: no changes were made");
        return Ok(());
    }

    let url = file.database_url(&args).ok_or_else(|| {
        CliError::Config(
            "No database URL. Pass --url, set DATABASE_URL or add [database] url to prax.toml".into(),
        )
    })?;
    let dialect = Dialect::from_url(&url)?;

    if !args.force {
        let prompt = format!(
            "Squash {} migrations into {}?",
            plan.retired.len(),
            config.artifact_filename()
        );
        if !output::confirm(&prompt) {
            output::warn("Squash cancelled");
            return Ok(());
        }
    }

    let total_steps = 2;
    if !args.json {
        output::step(1, total_steps, &format!("Connecting to {}...", dialect));
    }
    let conn = catalog::connect(&url).await?;

    if !args.json {
        output::step(2, total_steps, "Squashing...");
    }
    let report = match Squasher::new(config, Arc::from(conn)).run(&plan).await {
        Ok(report) => report,
        Err(e) => {
            print_failure(&e);
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_plan(plan: &SquashPlan) {
    output::section(&format!("Retire ({})", plan.retired.len()));
    for record in &plan.retired {
        output::removed_item(&record.filename);
    }
    output::newline();

    output::section(&format!("Keep ({})", plan.retained.len()));
    for record in &plan.retained {
        output::kept_item(&record.filename);
    }
    output::newline();
}

fn print_report(report: &SquashReport) {
    output::newline();
    success(&report.summary());

    if let Some(path) = &report.artifact {
        kv("Artifact", &path.display().to_string());
    }
    if let Some(dir) = &report.backup_dir {
        kv("Backup", &dir.display().to_string());
    }
    if let Some(rows) = report.ledger_rows_removed {
        kv("Ledger rows removed", &rows.to_string());
    }
}

fn print_failure(err: &SquashError) {
    if let SquashError::Orchestration {
        step,
        processed,
        pending,
        ..
    } = err
    {
        output::newline();
        output::warn(&format!("The {} step failed; completed steps were not undone", step));
        for name in processed {
            output::list_item(&format!("done: {}", name));
        }
        for name in pending {
            output::list_item(&format!("pending: {}", name));
        }
    }
}
