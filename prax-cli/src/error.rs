//! CLI error types and result alias.

use miette::Diagnostic;
use prax_squash::SquashError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(prax::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(prax::config))]
    Config(String),

    /// Invalid user input
    #[error("{0}")]
    #[diagnostic(code(prax::input), help("Dates use the YYYY-MM-DD format, e.g. 2024-01-31"))]
    Input(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(prax::database))]
    Database(String),

    /// Squash error
    #[error("{0}")]
    #[diagnostic(code(prax::squash))]
    Squash(String),

    /// Output formatting error
    #[error("Format error: {0}")]
    #[diagnostic(code(prax::format))]
    Format(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Format(format!("Failed to serialize JSON: {}", err))
    }
}

impl From<SquashError> for CliError {
    fn from(err: SquashError) -> Self {
        match err {
            SquashError::InvalidDate(_) => CliError::Input(err.to_string()),
            SquashError::Config(msg) => CliError::Config(msg),
            SquashError::Database(msg) | SquashError::UnsupportedCatalog(msg) => CliError::Database(msg),
            SquashError::Io(e) => CliError::Io(e),
            other => CliError::Squash(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prax_squash::SquashStep;

    #[test]
    fn test_from_squash_error() {
        let err: CliError = SquashError::InvalidDate("2024-02-30".into()).into();
        assert!(matches!(err, CliError::Input(_)));
        assert!(err.to_string().contains("2024-02-30"));

        let err: CliError = SquashError::other("boom")
            .at_step(SquashStep::Delete, vec![], vec!["a".into()])
            .into();
        assert!(matches!(err, CliError::Squash(_)));
        assert!(err.to_string().contains("delete step"));
    }
}
