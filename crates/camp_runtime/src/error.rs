//! Error types for the runtime module.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while declaring resources or resolving variables.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Unsupported operating system: {0} (expected \"linux\" or \"windows\")")]
    UnsupportedOs(String),

    #[error("Unsupported database engine: {0}")]
    UnsupportedEngine(String),

    #[error("Unsupported database capacity: {0}")]
    UnsupportedCapacity(u16),

    #[error("Invalid environment variable name: {0}")]
    InvalidEnvironmentName(String),

    #[error("Unknown variable reference: {0}")]
    UnknownVariable(String),

    #[error("Step '{id}' already exists in stage '{stage}'")]
    DuplicateStep { stage: String, id: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Core error: {0}")]
    Core(#[from] camp_core::CoreError),
}
