//! Migration file discovery.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SquashError, SquashResult};

/// Timestamp prefix format of migration file names.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";

/// Substring marking a previously synthesized artifact.
pub const ARTIFACT_MARKER: &str = "squashed_schema";

const TIMESTAMP_LEN: usize = 17;

/// One migration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// File name, including the extension.
    pub filename: String,
    /// File stem; the identifier stored in the migration ledger.
    pub name: String,
    /// Creation time taken from the name prefix.
    pub timestamp: NaiveDateTime,
    /// Free-text part of the name.
    pub short_name: String,
    /// Location on disk.
    pub path: PathBuf,
}

/// Compiled `YYYY_MM_DD_HHMMSS_name.ext` file-name pattern.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    regex: Regex,
    extension: String,
}

impl FilenamePattern {
    /// Compile the pattern for files with the given extension.
    pub fn new(extension: impl Into<String>) -> SquashResult<Self> {
        let extension = extension.into();
        let source = format!(r"^\d{{4}}_\d{{2}}_\d{{2}}_\d{{6}}_.+\.{}$", regex_lite::escape(&extension));
        let regex = Regex::new(&source)
            .map_err(|e| SquashError::config(format!("Invalid migration extension '{}': {}", extension, e)))?;
        Ok(Self { regex, extension })
    }

    /// Parse a file name such as `2024_01_15_093000_create_users_table.php`.
    ///
    /// Returns `None` when the name does not follow the convention or its
    /// timestamp is not a real date-time.
    pub fn parse(&self, path: &Path) -> Option<MigrationRecord> {
        let filename = path.file_name()?.to_str()?;
        if !self.regex.is_match(filename) {
            return None;
        }

        let name = filename.strip_suffix(self.extension.as_str())?.strip_suffix('.')?;
        let timestamp = NaiveDateTime::parse_from_str(&name[..TIMESTAMP_LEN], TIMESTAMP_FORMAT).ok()?;

        Some(MigrationRecord {
            filename: filename.to_string(),
            name: name.to_string(),
            timestamp,
            short_name: name[TIMESTAMP_LEN + 1..].to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Scanner for a migrations directory.
#[derive(Debug, Clone)]
pub struct MigrationInventory {
    migrations_dir: PathBuf,
    pattern: FilenamePattern,
    artifact_name: String,
}

impl MigrationInventory {
    /// Create a scanner.
    pub fn new(
        migrations_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        artifact_name: impl Into<String>,
    ) -> SquashResult<Self> {
        Ok(Self {
            migrations_dir: migrations_dir.into(),
            pattern: FilenamePattern::new(extension)?,
            artifact_name: artifact_name.into(),
        })
    }

    /// List migration records sorted by timestamp, then file name.
    ///
    /// Files that do not follow the naming convention, and earlier squash
    /// artifacts, are left out.
    pub async fn scan(&self) -> SquashResult<Vec<MigrationRecord>> {
        if !self.migrations_dir.is_dir() {
            return Err(SquashError::config(format!(
                "Migrations directory not found: {}",
                self.migrations_dir.display()
            )));
        }

        let mut entries = tokio::fs::read_dir(&self.migrations_dir).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let path = entry.path();
            let Some(record) = self.pattern.parse(&path) else {
                debug!(path = %path.display(), "Ignoring non-migration file");
                continue;
            };

            if record.name == self.artifact_name || record.name.contains(ARTIFACT_MARKER) {
                debug!(file = %record.filename, "Ignoring squash artifact");
                continue;
            }

            records.push(record);
        }

        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        debug!(count = records.len(), dir = %self.migrations_dir.display(), "Scanned migrations");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_record() {
        let record = FilenamePattern::new("php")
            .unwrap()
            .parse(Path::new("/app/2024_01_15_093000_create_users_table.php"))
            .unwrap();

        assert_eq!(record.name, "2024_01_15_093000_create_users_table");
        assert_eq!(record.short_name, "create_users_table");
        assert_eq!(
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2024_01_15_093000"
        );
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        let bad = [
            "2024_01_15_093000.php",
            "2024_1_15_093000_x.php",
            "2024_01_15_093000_x.sql",
            "2024_13_40_093000_x.php",
            "2024_01_15_256199_x.php",
            "readme.md",
        ];
        let pattern = FilenamePattern::new("php").unwrap();
        for name in bad {
            assert!(pattern.parse(Path::new(name)).is_none(), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2024_10_15_000000_d.php",
            "2023_01_01_000000_a.php",
            "0000_00_00_000000_squashed_schema.php",
            "2023_05_01_000000_squashed_schema_old.php",
            "notes.txt",
            "2023_06_01_000000_b.php",
        ] {
            std::fs::write(dir.path().join(name), "<?php").unwrap();
        }
        std::fs::create_dir(dir.path().join("2023_07_01_000000_dir.php")).unwrap();

        let inventory =
            MigrationInventory::new(dir.path(), "php", "0000_00_00_000000_squashed_schema").unwrap();
        let names: Vec<String> = inventory
            .scan()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.short_name)
            .collect();

        assert_eq!(names, vec!["a", "b", "d"]);
    }

    #[tokio::test]
    async fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = MigrationInventory::new(dir.path().join("missing"), "php", "artifact").unwrap();
        assert!(matches!(inventory.scan().await, Err(SquashError::Config(_))));
    }
}
