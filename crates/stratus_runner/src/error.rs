//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running a command.
///
/// A command that starts and exits non-zero is *not* an error at this
/// level; callers inspect [`crate::ExecutionResult::exit_code`].
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command timeout after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
