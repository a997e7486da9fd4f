//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use prax_squash::{SquashConfig, parse_cutoff};

use crate::cli::SquashArgs;
use crate::error::CliResult;

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "prax.toml";

/// Prax Squash configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Squash configuration
    pub squash: SquashSection,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `prax.toml` from a directory, or defaults when it is absent
    pub fn load_or_default(dir: &Path) -> CliResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Layer command-line flags over this file and the built-in defaults.
    ///
    /// `cutoff` is the already-parsed `--before` value. Relative paths are
    /// resolved against `cwd`.
    pub fn resolve(
        &self,
        args: &SquashArgs,
        cutoff: Option<NaiveDate>,
        cwd: &Path,
    ) -> CliResult<SquashConfig> {
        let file = &self.squash;
        let mut config = SquashConfig::new();

        if let Some(dir) = args.path.as_ref().or(file.migrations_dir.as_ref()) {
            config = config.migrations_dir(dir);
        }
        let migrations_dir = absolute(cwd, &config.migrations_dir);
        config = config.migrations_dir(migrations_dir);

        if let Some(ext) = &file.file_extension {
            config = config.file_extension(ext.as_str());
        }
        if let Some(name) = &file.artifact_name {
            config = config.artifact_name(name.as_str());
        }

        match (cutoff, &file.cutoff) {
            (Some(date), _) => config = config.cutoff(date),
            (None, Some(raw)) => config = config.cutoff(parse_cutoff(raw)?),
            (None, None) => {}
        }

        if let Some(keep) = args.keep.or(file.keep) {
            config = config.keep(keep);
        }

        config = config.backup(!args.no_backup && file.backup.unwrap_or(true));
        if let Some(dir) = &file.backup_dir {
            config = config.backup_dir(absolute(cwd, dir));
        }

        config = config.delete_records(args.delete_records || file.delete_records.unwrap_or(false));

        if let Some(table) = &file.ledger_table {
            config = config.ledger_table(table.as_str());
        }
        for table in file.excluded_tables.iter().chain(&args.exclude) {
            config = config.exclude_table(table.as_str());
        }
        if let Some(schema) = args.schema.as_ref().or(self.squash.database_schema.as_ref()) {
            config = config.database_schema(schema.as_str());
        }

        config.validate()?;
        Ok(config)
    }

    /// Connection URL: the flag or `DATABASE_URL`, then the file
    pub fn database_url(&self, args: &SquashArgs) -> Option<String> {
        args.url.clone().or_else(|| self.database.url.clone())
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: Option<String>,
}

/// `[squash]` table; unset keys fall back to the built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SquashSection {
    /// Directory holding the migration files
    pub migrations_dir: Option<PathBuf>,

    /// Migration file extension
    pub file_extension: Option<String>,

    /// Name of the squashed migration, without extension
    pub artifact_name: Option<String>,

    /// Cutoff date (YYYY-MM-DD)
    pub cutoff: Option<String>,

    /// Number of most recent migrations to keep
    pub keep: Option<i64>,

    /// Copy retired migrations before deleting them
    pub backup: Option<bool>,

    /// Backup root directory
    pub backup_dir: Option<PathBuf>,

    /// Rewrite the migrations table
    pub delete_records: Option<bool>,

    /// Migrations table name
    pub ledger_table: Option<String>,

    /// Tables left out of the squashed migration
    pub excluded_tables: Vec<String>,

    /// Database schema to introspect
    pub database_schema: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(s: &str) -> Config {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default()
            .resolve(&SquashArgs::default(), None, Path::new("/app"))
            .unwrap();
        assert_eq!(config.migrations_dir, PathBuf::from("/app/database/migrations"));
        assert_eq!(config.keep, 5);
        assert!(config.backup);
        assert!(!config.delete_records);
    }

    #[test]
    fn test_file_values() {
        let file = from_toml(
            r#"
            [database]
            url = "sqlite://app.db"

            [squash]
            migrations_dir = "migrations"
            cutoff = "2024-01-01"
            keep = 2
            backup = false
            excluded_tables = ["jobs"]
            "#,
        );
        let config = file.resolve(&SquashArgs::default(), None, Path::new("/app")).unwrap();

        assert_eq!(config.migrations_dir, PathBuf::from("/app/migrations"));
        assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.keep, 2);
        assert!(!config.backup);
        assert!(config.excluded_set().contains("jobs"));
        assert_eq!(
            file.database_url(&SquashArgs::default()).as_deref(),
            Some("sqlite://app.db")
        );
    }

    #[test]
    fn test_flags_override_file() {
        let file = from_toml(
            r#"
            [database]
            url = "sqlite://file.db"

            [squash]
            keep = 2
            cutoff = "2024-01-01"
            "#,
        );
        let args = SquashArgs {
            keep: Some(7),
            url: Some("postgres://flag/db".into()),
            no_backup: true,
            exclude: vec!["sessions".into()],
            ..Default::default()
        };
        let cutoff = NaiveDate::from_ymd_opt(2023, 5, 1);
        let config = file.resolve(&args, cutoff, Path::new("/app")).unwrap();

        assert_eq!(config.keep, 7);
        assert_eq!(config.cutoff, cutoff.unwrap());
        assert!(!config.backup);
        assert!(config.excluded_set().contains("sessions"));
        assert_eq!(file.database_url(&args).as_deref(), Some("postgres://flag/db"));
    }

    #[test]
    fn test_invalid_file_cutoff() {
        let file = from_toml("[squash]\ncutoff = \"soon\"\n");
        assert!(file.resolve(&SquashArgs::default(), None, Path::new("/app")).is_err());
    }
}
