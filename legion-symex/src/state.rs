//! The opaque symbolic state handle
//!
//! Level 3 - state representation

use std::sync::Arc;

use legion_core::Address;

use crate::reference::Branch;

/// A symbolic execution state.
///
/// Cheap to clone (an `Arc`-wrapped path condition) so that Red, Gold and
/// Black tree nodes can each hold one without duplicating solver state.
/// The path condition representation here is specific to `ReferenceEngine`;
/// a real backend would instead wrap its own opaque handle, but every
/// consumer in this workspace only ever calls `SymEngine` methods on a
/// `SymState`, never inspects its fields.
#[derive(Clone, Debug)]
pub struct SymState {
    pub(crate) addr: Address,
    pub(crate) path: Arc<Vec<Branch>>,
}

impl SymState {
    /// The address this state is positioned at.
    pub fn addr(&self) -> Address {
        self.addr
    }
}

/// One element of the lazy stream produced by `SymEngine::iterate`.
///
/// `NeedsSolving` is the `⊥` marker of the original design: it signals that
/// producing the next concrete value would require an additional
/// constraint-solving call, which the Sampler uses as a cheap cue to stop
/// once `MIN_SAMPLES` have already been produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterateStep {
    Value(u64),
    NeedsSolving,
}
