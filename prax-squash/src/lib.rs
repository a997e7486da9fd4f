//! # prax-squash
//!
//! Compacts a long history of timestamped migration files into one
//! synthesized migration that rebuilds the live schema.
//!
//! The crate is organized around a short pipeline:
//!
//! - [`catalog`] - connections to PostgreSQL, MySQL/MariaDB, SQLite and SQL Server
//! - [`introspect`] - metadata providers (native catalogs and `INFORMATION_SCHEMA` reflection)
//! - [`blueprint`] and [`types`] - idiom recognition and type mapping
//! - [`printer`] and [`synth`] - deterministic PHP migration rendering
//! - [`inventory`] and [`retention`] - migration discovery and retirement planning
//! - [`squash`] - backup, artifact write, ledger rewrite and file removal
//!
//! ## Planning
//!
//! Retirement is a pure function of the migration set, a cutoff date and a
//! retained-tail size:
//!
//! ```rust
//! use std::path::Path;
//! use chrono::NaiveDate;
//! use prax_squash::{FilenamePattern, MigrationRecord, select_for_retirement};
//!
//! let pattern = FilenamePattern::new("php").unwrap();
//! let records: Vec<MigrationRecord> = [
//!     "2023_01_01_000000_a.php",
//!     "2023_06_01_000000_b.php",
//!     "2024_10_01_000000_c.php",
//!     "2024_10_15_000000_d.php",
//! ]
//! .iter()
//! .filter_map(|f| pattern.parse(Path::new(f)))
//! .collect();
//!
//! let cutoff = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let retired = select_for_retirement(&records, cutoff, 2);
//! assert_eq!(retired.len(), 2);
//! ```
//!
//! ## Squashing
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prax_squash::{SquashConfig, Squasher, catalog};
//!
//! # async fn run() -> prax_squash::SquashResult<()> {
//! let conn = catalog::connect("postgres://localhost/app").await?;
//! let config = SquashConfig::new().migrations_dir("database/migrations").keep(5);
//!
//! let report = Squasher::new(config, Arc::from(conn)).squash().await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod blueprint;
pub mod catalog;
pub mod config;
pub mod error;
pub mod introspect;
pub mod inventory;
pub mod ledger;
pub mod logging;
pub mod printer;
pub mod retention;
pub mod squash;
pub mod synth;
pub mod types;

pub use backup::BackupWriter;
pub use blueprint::{ColumnToken, MorphFlavor, TableBlueprint, Token, recognize};
pub use catalog::{CatalogConnection, CatalogRow, CatalogValue, Dialect, SqlParam, connect};
pub use config::{SquashConfig, parse_cutoff};
pub use error::{SquashError, SquashResult, SquashStep};
pub use introspect::{
    ColumnDescriptor, DefaultValue, ForeignKeyDescriptor, IndexDescriptor, MetadataProvider,
    NativeProvider, ReferentialAction, ReflectionProvider, TableDescriptor, select_provider,
};
pub use inventory::{FilenamePattern, MigrationInventory, MigrationRecord};
pub use ledger::{Ledger, LedgerUpdate};
pub use printer::MigrationPrinter;
pub use retention::{SquashPlan, select_for_retirement};
pub use squash::{SquashReport, Squasher, plan};
pub use synth::{SynthesizedArtifact, Synthesizer};
pub use types::ColumnType;
