use crate::location::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Tagged error kinds returned by the refactor operations.
///
/// Internal plumbing (the CST layer, the symbol table, the dependency
/// analyzer) is free to return `anyhow::Result`; only the planner's
/// public operations commit to this enum.
#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("could not parse target `{input}`: {reason}")]
    TargetParse { input: String, reason: String },

    #[error("symbol `{name}` not found in {file}")]
    SymbolNotFound { name: String, file: PathBuf },

    #[error("symbol `{name}` is ambiguous: defined {} times in {file}", matches.len())]
    AmbiguousSymbol {
        name: String,
        file: PathBuf,
        matches: Vec<Location>,
    },

    #[error("cannot move without pulling in shared dependencies: {}", shared_symbols.join(", "))]
    CircularDependency { shared_symbols: Vec<String> },

    #[error("refactoring failed: {message}")]
    Refactoring {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RefactorError {
    pub fn refactoring(message: impl Into<String>) -> Self {
        Self::Refactoring {
            message: message.into(),
            source: None,
        }
    }
}

impl From<std::io::Error> for RefactorError {
    fn from(err: std::io::Error) -> Self {
        Self::Refactoring {
            message: "filesystem operation failed".to_string(),
            source: Some(err.into()),
        }
    }
}

impl From<anyhow::Error> for RefactorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Refactoring {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, RefactorError>;
