//! Error types for the squash engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for squash operations.
pub type SquashResult<T> = Result<T, SquashError>;

/// Orchestration phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquashStep {
    /// Copying retired change units into the backup directory.
    Backup,
    /// Introspecting the catalog and writing the artifact.
    Synthesize,
    /// Rewriting the change-history ledger.
    Ledger,
    /// Removing retired change units from the live directory.
    Delete,
}

impl fmt::Display for SquashStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::Synthesize => write!(f, "synthesize"),
            Self::Ledger => write!(f, "ledger"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors that can occur while planning or running a squash.
#[derive(Debug, Error)]
pub enum SquashError {
    /// The connection URL names a catalog dialect we cannot introspect.
    #[error("Unsupported catalog: {0}")]
    UnsupportedCatalog(String),

    /// A cutoff date could not be parsed.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation error.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backup directory could not be prepared.
    #[error("Backup failed: {0}")]
    BackupFailed(String),

    /// A squash step failed after earlier steps completed.
    #[error(
        "Squash failed during {step} step ({} processed, {} pending): {source}",
        processed.len(),
        pending.len()
    )]
    Orchestration {
        /// Step that failed.
        step: SquashStep,
        /// Change units the failed step had already handled.
        processed: Vec<String>,
        /// Change units the failed step had not handled.
        pending: Vec<String>,
        /// Underlying failure.
        #[source]
        source: Box<SquashError>,
    },

    /// General error.
    #[error("Squash error: {0}")]
    Other(String),
}

impl SquashError {
    /// Create an unsupported catalog error.
    pub fn unsupported_catalog(msg: impl Into<String>) -> Self {
        Self::UnsupportedCatalog(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a backup error.
    pub fn backup(msg: impl Into<String>) -> Self {
        Self::BackupFailed(msg.into())
    }

    /// Create an other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Wrap this error as the failure of an orchestration step.
    pub fn at_step(self, step: SquashStep, processed: Vec<String>, pending: Vec<String>) -> Self {
        Self::Orchestration {
            step,
            processed,
            pending,
            source: Box::new(self),
        }
    }

    /// The orchestration step that failed, if any.
    pub fn failed_step(&self) -> Option<SquashStep> {
        match self {
            Self::Orchestration { step, .. } => Some(*step),
            _ => None,
        }
    }
}
