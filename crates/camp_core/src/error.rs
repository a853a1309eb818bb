//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building or querying the construct tree.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Construct is not attached to this tree: #{0}")]
    UnknownConstruct(usize),

    #[error("Construct '{id}' already exists under '{parent}'")]
    DuplicateConstruct { parent: String, id: String },

    #[error("Construct '{path}' is not inside a stack")]
    NotInStack { path: String },

    #[error("Missing config in context: {0}")]
    MissingContext(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
