//! Legion SymEngine adapter - symbolic execution as an opaque backend
//!
//! This crate plays the role the teacher's GPU rollout engine played for
//! MCTS simulation: a pluggable compute backend the search crate drives
//! without caring about its internals. Here the backend is symbolic
//! execution rather than GPU rollouts.
//!
//! ## Architecture
//! - Level 2: the `SymEngine` trait and `SymState` handle
//! - Level 3: the in-process reference backend (`ReferenceEngine`)
//! - Level 4: iterator / error plumbing

mod error;
mod reference;
mod state;

pub use error::SymExError;
pub use reference::{Branch, Cfg, ReferenceEngine};
pub use state::{IterateStep, SymState};

use legion_core::Address;

/// A symbolic execution backend.
///
/// Any engine meeting this contract - an in-process reference model, or a
/// bridge to a real symbolic executor such as angr - is acceptable. The
/// orchestrator and tree never match on a concrete backend type.
pub trait SymEngine: Send + Sync {
    /// Produce a symbolic state positioned at the target's entry point,
    /// with standard input modeled as an unbounded symbolic byte stream.
    fn load_entry(&self) -> Result<SymState, SymExError>;

    /// Single-step symbolic execution, returning every feasible successor
    /// state together with its address. An empty result means symbolic
    /// execution has reached the end of the program from this state.
    fn step(&self, state: &SymState) -> Result<Vec<SymState>, SymExError>;

    /// Whether `state`'s path condition carries any constraints at all -
    /// used by the Sampler to decide between constraint-guided and
    /// uninformed random sampling.
    fn has_constraints(&self, state: &SymState) -> bool;

    /// The current bit-width of the state's symbolic stdin stream. Must be
    /// recomputed on every call rather than cached, since symbolic stdin
    /// can grow while `iterate` is driven.
    fn stdin_bit_width(&self, state: &SymState) -> usize;

    /// Yield concrete assignments of the state's stdin stream that satisfy
    /// its path condition. Terminates (`Iterator::next` returns `None`)
    /// when the path condition admits no more models.
    fn iterate<'a>(
        &'a self,
        state: &'a SymState,
    ) -> Box<dyn Iterator<Item = IterateStep> + 'a>;
}

/// The address a fresh `load_entry` state is positioned at, before any
/// trace has told the orchestrator what `main`'s real address is. The
/// orchestrator overwrites the root's address with the traces' agreed
/// `main_addr` during initialisation; this constant only matters to
/// backends that need a placeholder.
pub const ENTRY_PLACEHOLDER_ADDR: Address = 0;
