//! Error kinds for the tree and colouring protocol
//!
//! Level 4 - error plumbing

use legion_symex::SymExError;

/// Errors raised while mutating or querying the search tree.
///
/// `Invariant` corresponds to the "Contract violation (asserts)" row of the
/// error handling table: in debug builds the call sites additionally
/// `debug_assert!`, so a violation panics with a stack trace during
/// development; in release builds this variant is returned and the caller
/// (the orchestrator) terminates the run.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("node invariant violated: {0}")]
    Invariant(String),

    #[error("symbolic execution failed: {0}")]
    SymEx(#[from] SymExError),
}
