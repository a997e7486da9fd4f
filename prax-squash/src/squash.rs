//! Squash orchestration.
//!
//! A run executes four steps strictly in order, each gating the next:
//!
//! 1. **Backup**: copy the retired files into a fresh backup directory.
//! 2. **Synthesize**: introspect the catalog and write the artifact atomically.
//! 3. **Ledger**: replace the retired ledger rows with one artifact row.
//! 4. **Delete**: remove the retired files.
//!
//! A failure stops the run and is reported as
//! [`SquashError::Orchestration`]. Completed steps are not undone; the
//! backup directory is the recovery path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::backup::BackupWriter;
use crate::catalog::CatalogConnection;
use crate::config::SquashConfig;
use crate::error::{SquashError, SquashResult, SquashStep};
use crate::introspect::select_provider;
use crate::inventory::MigrationInventory;
use crate::ledger::Ledger;
use crate::retention::SquashPlan;
use crate::synth::{SynthesizedArtifact, Synthesizer};

/// Outcome of a completed squash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SquashReport {
    /// Ledger identifiers of the retired migrations.
    pub retired: Vec<String>,
    /// Written artifact; `None` when there was nothing to squash.
    pub artifact: Option<PathBuf>,
    /// Backup directory, when backups were taken.
    pub backup_dir: Option<PathBuf>,
    /// Ledger rows deleted, when the ledger was rewritten.
    pub ledger_rows_removed: Option<u64>,
    /// Tables in the artifact, in creation order.
    pub tables: Vec<String>,
}

impl SquashReport {
    /// Get a summary of the report.
    pub fn summary(&self) -> String {
        if self.artifact.is_none() {
            return "Nothing to squash".to_string();
        }

        let mut parts = vec![
            format!("{} migrations squashed", self.retired.len()),
            format!("{} tables synthesized", self.tables.len()),
        ];
        if let Some(rows) = self.ledger_rows_removed {
            parts.push(format!("{} ledger rows removed", rows));
        }
        parts.join(", ")
    }
}

/// Scan the migrations directory and plan the squash.
///
/// Touches only the filesystem, never the catalog.
pub async fn plan(config: &SquashConfig) -> SquashResult<SquashPlan> {
    config.validate()?;
    let inventory = MigrationInventory::new(
        &config.migrations_dir,
        &config.file_extension,
        &config.artifact_name,
    )?;
    let records = inventory.scan().await?;
    let plan = SquashPlan::compute(&records, config.cutoff, config.keep);

    info!(
        total = records.len(),
        retired = plan.retired.len(),
        cutoff = %plan.cutoff,
        keep = plan.keep,
        "Planned squash"
    );
    Ok(plan)
}

/// Write `contents` to `path` through a temporary sibling and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> SquashResult<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SquashError::config(format!("Invalid artifact path: {}", path.display())))?;
    let tmp = dir.join(format!(".{}.tmp", filename));

    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Runs squash plans against one catalog connection.
pub struct Squasher {
    config: SquashConfig,
    conn: Arc<dyn CatalogConnection>,
}

impl Squasher {
    /// Create a squasher.
    pub fn new(config: SquashConfig, conn: Arc<dyn CatalogConnection>) -> Self {
        Self { config, conn }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SquashConfig {
        &self.config
    }

    /// Introspect the catalog and render the artifact without writing it.
    pub async fn synthesize(&self) -> SquashResult<SynthesizedArtifact> {
        let provider = select_provider(Arc::clone(&self.conn), self.config.database_schema.as_deref()).await?;
        debug!(rich = provider.supports_rich_introspection(), "Metadata provider ready");

        let excluded = self.config.excluded_set();
        Synthesizer::new(provider.as_ref(), excluded).synthesize().await
    }

    /// Plan and run in one call.
    pub async fn squash(&self) -> SquashResult<SquashReport> {
        let plan = plan(&self.config).await?;
        self.run(&plan).await
    }

    /// Execute a plan.
    pub async fn run(&self, plan: &SquashPlan) -> SquashResult<SquashReport> {
        self.config.validate()?;
        let names = plan.retired_names();

        if plan.is_empty() {
            info!("Nothing to squash");
            return Ok(SquashReport::default());
        }

        let mut report = SquashReport {
            retired: names.clone(),
            ..Default::default()
        };

        // 1. Backup
        if self.config.backup {
            let started = Local::now().naive_local();
            let dir = BackupWriter::new(self.config.resolved_backup_dir())
                .write(started, &plan.retired)
                .await?;
            report.backup_dir = Some(dir);
        }

        // 2. Synthesize
        let artifact = self
            .synthesize()
            .await
            .map_err(|e| e.at_step(SquashStep::Synthesize, Vec::new(), names.clone()))?;
        let path = self.config.artifact_path();
        write_atomic(&path, &artifact.source)
            .await
            .map_err(|e| e.at_step(SquashStep::Synthesize, Vec::new(), names.clone()))?;
        info!(path = %path.display(), tables = artifact.tables.len(), "Artifact written");
        report.artifact = Some(path);
        report.tables = artifact.tables;

        // 3. Ledger
        if self.config.delete_records {
            let update = Ledger::new(self.conn.as_ref(), &self.config.ledger_table)
                .replace(&names, &self.config.artifact_name)
                .await
                .map_err(|e| e.at_step(SquashStep::Ledger, Vec::new(), names.clone()))?;
            report.ledger_rows_removed = Some(update.removed);
        }

        // 4. Delete
        let mut deleted = Vec::with_capacity(plan.retired.len());
        for (i, record) in plan.retired.iter().enumerate() {
            if let Err(e) = tokio::fs::remove_file(&record.path).await {
                return Err(SquashError::from(e).at_step(SquashStep::Delete, deleted, names[i..].to_vec()));
            }
            debug!(file = %record.filename, "Deleted migration");
            deleted.push(record.name.clone());
        }
        info!(count = deleted.len(), "Retired migrations deleted");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000_00_00_000000_squashed_schema.php");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_report_summary() {
        assert_eq!(SquashReport::default().summary(), "Nothing to squash");

        let report = SquashReport {
            retired: vec!["a".into(), "b".into()],
            artifact: Some(PathBuf::from("x.php")),
            tables: vec!["users".into()],
            ledger_rows_removed: Some(2),
            ..Default::default()
        };
        assert_eq!(
            report.summary(),
            "2 migrations squashed, 1 tables synthesized, 2 ledger rows removed"
        );
    }

    #[tokio::test]
    async fn test_plan_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2023_01_01_000000_a.php", "2023_06_01_000000_b.php", "2024_10_01_000000_c.php"] {
            std::fs::write(dir.path().join(name), "<?php").unwrap();
        }
        let config = SquashConfig::new()
            .migrations_dir(dir.path())
            .cutoff(crate::config::parse_cutoff("2024-01-01").unwrap())
            .keep(1);

        let plan = plan(&config).await.unwrap();
        assert_eq!(plan.retired_names(), vec!["2023_01_01_000000_a", "2023_06_01_000000_b"]);
    }
}
