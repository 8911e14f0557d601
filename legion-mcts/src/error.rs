//! Error kinds for the MCTS orchestrator
//!
//! Level 4 - error plumbing
//!
//! Aggregates every collaborator's error type via `#[from]`, matching the
//! teacher's per-crate `thiserror` enums (e.g. `hexwar-gpu`'s `GpuError`)
//! rather than inventing a flat ad-hoc error.

use legion_runner::RunnerError;
use legion_symex::SymExError;
use legion_tree::TreeError;

/// Errors that can terminate a run.
///
/// Only `Timeout` and `Invariant` are fatal per `spec.md` §7 - every other
/// recoverable condition maps to a monotone tree update rather than an
/// error return, so it never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum LegionError {
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("symbolic execution error: {0}")]
    SymEx(#[from] SymExError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("traces in the initial batch disagree on main's address")]
    InconsistentEntry,

    #[error("no executions were produced by the initial batch")]
    EmptyInitialBatch,

    #[error("artefact sink error: {0}")]
    Sink(#[from] anyhow::Error),
}
