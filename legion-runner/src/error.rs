//! Error kinds for target execution
//!
//! Level 4 - error plumbing

/// Errors raised while executing the target binary.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to spawn target: {0}")]
    Spawn(String),

    #[error("failed to wait on target: {0}")]
    Wait(String),

    #[error("target exceeded its execution timeout and was killed")]
    TimedOut,

    #[error("failed to read target output: {0}")]
    ReadOutput(String),

    #[error("could not decode trace from stderr: {0}")]
    StderrDecode(String),
}
