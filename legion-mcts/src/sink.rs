//! The artefact persistence boundary
//!
//! Level 4 - trait seam
//!
//! Defined here, rather than in `legion-sink`, to keep the workspace's crate
//! graph acyclic: the orchestrator must call into persistence, but
//! persistence has no reason to depend on the search tree. `legion-cli`
//! wires a concrete `ArtefactSink` (from `legion-sink`) into [`crate::Orchestrator::run`].

use legion_core::ByteInput;
use legion_runner::ExecutionOutcome;

/// Receives every newly-discovered execution the orchestrator performs.
///
/// Mirrors `Legion.py`'s `save_news_to_file`: called only for executions that
/// contributed a new path (`is_new`), in the order they were produced.
pub trait ArtefactSink {
    fn record(&mut self, input: &ByteInput, outcome: &ExecutionOutcome) -> anyhow::Result<()>;
}

/// A sink that discards everything - the default when neither
/// `--save-inputs` nor `--save-tests` is passed, and for tests that don't
/// care about persisted artefacts.
#[derive(Default)]
pub struct NullSink;

impl ArtefactSink for NullSink {
    fn record(&mut self, _input: &ByteInput, _outcome: &ExecutionOutcome) -> anyhow::Result<()> {
        Ok(())
    }
}
