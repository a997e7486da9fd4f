//! Squash configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{SquashError, SquashResult};

/// Default name of the synthesized artifact, without extension.
pub const DEFAULT_ARTIFACT_NAME: &str = "0000_00_00_000000_squashed_schema";

/// Default retained-tail size.
pub const DEFAULT_KEEP: i64 = 5;

/// Date format accepted for the cutoff.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` cutoff date.
pub fn parse_cutoff(input: &str) -> SquashResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| SquashError::InvalidDate(input.to_string()))
}

/// The date one year before today.
pub fn default_cutoff() -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_sub_months(Months::new(12)).unwrap_or(today)
}

/// Configuration for a squash run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquashConfig {
    /// Directory holding the migration files.
    pub migrations_dir: PathBuf,
    /// Migration file extension, without the dot.
    pub file_extension: String,
    /// Name of the synthesized artifact, without extension.
    pub artifact_name: String,
    /// Only migrations created before this date are retired.
    pub cutoff: NaiveDate,
    /// Number of most recent migrations never retired.
    pub keep: i64,
    /// Copy retired files before deleting them.
    pub backup: bool,
    /// Backup root; defaults to a sibling of the migrations directory.
    pub backup_dir: Option<PathBuf>,
    /// Rewrite the migration ledger table.
    pub delete_records: bool,
    /// Migration ledger table.
    pub ledger_table: String,
    /// Tables left out of the artifact, besides the ledger.
    pub excluded_tables: Vec<String>,
    /// Schema to introspect; the connection's current one when unset.
    pub database_schema: Option<String>,
}

impl Default for SquashConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("database/migrations"),
            file_extension: "php".to_string(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            cutoff: default_cutoff(),
            keep: DEFAULT_KEEP,
            backup: true,
            backup_dir: None,
            delete_records: false,
            ledger_table: "migrations".to_string(),
            excluded_tables: Vec::new(),
            database_schema: None,
        }
    }
}

impl SquashConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Set the migration file extension.
    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    /// Set the artifact name.
    pub fn artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = name.into();
        self
    }

    /// Set the cutoff date.
    pub fn cutoff(mut self, cutoff: NaiveDate) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Set the retained-tail size.
    pub fn keep(mut self, keep: i64) -> Self {
        self.keep = keep;
        self
    }

    /// Enable or disable backups.
    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Set the backup root directory.
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// Enable or disable ledger rewriting.
    pub fn delete_records(mut self, delete: bool) -> Self {
        self.delete_records = delete;
        self
    }

    /// Set the ledger table name.
    pub fn ledger_table(mut self, table: impl Into<String>) -> Self {
        self.ledger_table = table.into();
        self
    }

    /// Exclude a table from the artifact.
    pub fn exclude_table(mut self, table: impl Into<String>) -> Self {
        self.excluded_tables.push(table.into());
        self
    }

    /// Set the schema to introspect.
    pub fn database_schema(mut self, schema: impl Into<String>) -> Self {
        self.database_schema = Some(schema.into());
        self
    }

    /// Backup root, resolved.
    pub fn resolved_backup_dir(&self) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => self
                .migrations_dir
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .join("migration-backups"),
        }
    }

    /// Artifact file name, with extension.
    pub fn artifact_filename(&self) -> String {
        format!("{}.{}", self.artifact_name, self.file_extension)
    }

    /// Where the artifact is written.
    pub fn artifact_path(&self) -> PathBuf {
        self.migrations_dir.join(self.artifact_filename())
    }

    /// All tables left out of the artifact: the ledger plus configured ones.
    pub fn excluded_set(&self) -> BTreeSet<String> {
        std::iter::once(self.ledger_table.clone())
            .chain(self.excluded_tables.iter().cloned())
            .collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SquashResult<()> {
        if self.file_extension.is_empty() {
            return Err(SquashError::config("file_extension must not be empty"));
        }
        if self.artifact_name.is_empty() || self.artifact_name.contains(['/', '\\']) {
            return Err(SquashError::config(format!(
                "artifact_name must be a plain file name, got '{}'",
                self.artifact_name
            )));
        }
        if self.ledger_table.trim().is_empty() {
            return Err(SquashError::config("ledger_table must not be empty"));
        }
        Ok(())
    }
}
