//! Backups of retired migration files.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{SquashError, SquashResult, SquashStep};
use crate::inventory::{MigrationRecord, TIMESTAMP_FORMAT};

/// Name of the backup directory for an invocation started at `started`.
pub fn backup_dir_name(started: NaiveDateTime) -> String {
    started.format(TIMESTAMP_FORMAT).to_string()
}

/// Copies retired migrations into a fresh, timestamp-named directory.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    root: PathBuf,
}

impl BackupWriter {
    /// Create a writer for the given backup root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `<root>/<timestamp>` and copy every record into it.
    ///
    /// An existing directory with the same name is an error. Failures are
    /// reported as a backup-step error listing copied and pending files.
    pub async fn write(&self, started: NaiveDateTime, records: &[MigrationRecord]) -> SquashResult<PathBuf> {
        let names = |rs: &[MigrationRecord]| rs.iter().map(|r| r.name.clone()).collect::<Vec<_>>();

        let target = self.root.join(backup_dir_name(started));
        self.prepare(&target)
            .await
            .map_err(|e| e.at_step(SquashStep::Backup, Vec::new(), names(records)))?;

        let mut copied = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let dest = target.join(&record.filename);
            if let Err(e) = tokio::fs::copy(&record.path, &dest).await {
                return Err(SquashError::backup(format!("copying {}: {}", record.filename, e))
                    .at_step(SquashStep::Backup, copied, names(&records[i..])));
            }
            debug!(file = %record.filename, "Backed up migration");
            copied.push(record.name.clone());
        }

        info!(dir = %target.display(), files = copied.len(), "Backup complete");
        Ok(target)
    }

    async fn prepare(&self, target: &Path) -> SquashResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SquashError::backup(format!("creating {}: {}", self.root.display(), e)))?;

        match tokio::fs::create_dir(target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(SquashError::backup(
                format!("backup directory already exists: {}", target.display()),
            )),
            Err(e) => Err(SquashError::backup(format!("creating {}: {}", target.display(), e))),
        }
    }
}
