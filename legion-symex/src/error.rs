//! Error kinds for the SymEngine adapter
//!
//! Level 4 - error plumbing

/// Errors a `SymEngine` backend can report.
///
/// `step` returning an empty successor list is not an error - it is the
/// "symbolic execution reached the end of the program" case handled by the
/// colouring protocol (`spec.md` §4.D) and the Sampler (`spec.md` §4.E), not
/// a backend failure.
#[derive(Debug, thiserror::Error)]
pub enum SymExError {
    #[error("failed to load entry state: {0}")]
    LoadFailed(String),

    #[error("single-step execution failed at {addr:#x}: {reason}")]
    StepFailed { addr: i64, reason: String },
}
