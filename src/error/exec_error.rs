//! Execution-path error types.

use thiserror::Error;

/// Errors raised while loading a script runtime or executing a script.
///
/// Script failures travel back to the caller inside the normal reply
/// envelope; there is no separate error event channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("Runtime load failed: {0}")]
    RuntimeLoad(String),
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Script too large (max {max} bytes, got {actual} bytes)")]
    ScriptTooLarge { max: usize, actual: usize },
    #[error("Output too large (max {max} bytes, got {actual} bytes)")]
    OutputTooLarge { max: usize, actual: usize },
    #[error("Input binding '{0}' collides with a runtime-reserved name")]
    ReservedBinding(String),
    #[error("Input binding '{0}' is not a valid identifier")]
    InvalidBinding(String),
    #[error("Script execution timeout")]
    Timeout,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Worker terminated")]
    Terminated,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ExecError {
    fn from(e: serde_json::Error) -> Self {
        ExecError::Serialization(e.to_string())
    }
}
