//! In-process reference `SymEngine` backend
//!
//! Level 3 - a small, deterministic symbolic-execution stand-in.
//!
//! This is not a real symbolic executor: it walks a caller-supplied control
//! flow graph whose edges are annotated with bit-level constraints on the
//! target's stdin stream. It exists to let `legion-tree` and `legion-mcts`
//! be built, tested, and exercised end-to-end (colouring, phantom discovery,
//! constraint-guided sampling) without depending on a real backend such as
//! angr. A production deployment swaps this crate's consumer-facing trait
//! impl for one that bridges to a real symbolic executor; nothing above this
//! crate needs to change.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use legion_core::Address;

use crate::error::SymExError;
use crate::state::{IterateStep, SymState};
use crate::SymEngine;

/// A single-bit constraint on the target's stdin stream: byte `byte_index`
/// must have bit `bit` (0 = least significant) equal to `value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch {
    pub byte_index: usize,
    pub bit: u8,
    pub value: bool,
}

/// An outgoing edge of the control-flow graph: unconditional if `guard` is
/// `None`, otherwise feasible only under `guard`.
#[derive(Clone, Debug)]
pub struct Edge {
    pub to: Address,
    pub guard: Option<Branch>,
}

/// A hand-authored control-flow graph driving `ReferenceEngine`.
#[derive(Clone, Debug, Default)]
pub struct Cfg {
    pub entry: Address,
    edges: FxHashMap<Address, Vec<Edge>>,
}

impl Cfg {
    pub fn new(entry: Address) -> Self {
        Self {
            entry,
            edges: FxHashMap::default(),
        }
    }

    /// Add an unconditional (forced) edge `from -> to`.
    pub fn forced(mut self, from: Address, to: Address) -> Self {
        self.edges.entry(from).or_default().push(Edge { to, guard: None });
        self
    }

    /// Add a guarded edge `from -> to`, feasible only when `guard` holds.
    pub fn guarded(mut self, from: Address, to: Address, guard: Branch) -> Self {
        self.edges
            .entry(from)
            .or_default()
            .push(Edge { to, guard: Some(guard) });
        self
    }
}

/// The reference `SymEngine` implementation: single-steps a `Cfg`.
pub struct ReferenceEngine {
    cfg: Cfg,
}

impl ReferenceEngine {
    pub fn new(cfg: Cfg) -> Self {
        Self { cfg }
    }

    fn max_byte_index(path: &[Branch]) -> Option<usize> {
        path.iter().map(|b| b.byte_index).max()
    }
}

impl SymEngine for ReferenceEngine {
    fn load_entry(&self) -> Result<SymState, SymExError> {
        Ok(SymState {
            addr: self.cfg.entry,
            path: Arc::new(Vec::new()),
        })
    }

    fn step(&self, state: &SymState) -> Result<Vec<SymState>, SymExError> {
        let Some(edges) = self.cfg.edges.get(&state.addr) else {
            return Ok(Vec::new());
        };

        let mut successors = Vec::with_capacity(edges.len());
        for edge in edges {
            let mut path = (*state.path).clone();
            if let Some(guard) = edge.guard {
                path.push(guard);
            }
            successors.push(SymState {
                addr: edge.to,
                path: Arc::new(path),
            });
        }
        Ok(successors)
    }

    fn has_constraints(&self, state: &SymState) -> bool {
        !state.path.is_empty()
    }

    fn stdin_bit_width(&self, state: &SymState) -> usize {
        match Self::max_byte_index(&state.path) {
            Some(max_idx) => (max_idx + 1) * 8,
            None => 8,
        }
    }

    fn iterate<'a>(
        &'a self,
        state: &'a SymState,
    ) -> Box<dyn Iterator<Item = IterateStep> + 'a> {
        let bits = self.stdin_bit_width(state).min(32);
        Box::new(ModelIter {
            path: state.path.clone(),
            bits,
            cursor: 0,
            limit: 1u64 << bits,
            emitted_since_solve: 0,
        })
    }
}

/// Lazily enumerates concrete stdin values satisfying a path condition.
///
/// Emits one `NeedsSolving` marker after every three satisfying values, to
/// model the cost of constraint solving the way a real backend would.
struct ModelIter {
    path: Arc<Vec<Branch>>,
    bits: usize,
    cursor: u64,
    limit: u64,
    emitted_since_solve: u32,
}

impl ModelIter {
    fn satisfies(&self, candidate: u64) -> bool {
        self.path.iter().all(|branch| {
            if branch.byte_index * 8 + branch.bit as usize >= self.bits {
                // The constrained bit falls outside the currently modeled
                // width; treat it as unconstrained for this enumeration.
                return true;
            }
            let bit_pos = branch.byte_index * 8 + branch.bit as usize;
            let actual = (candidate >> bit_pos) & 1 == 1;
            actual == branch.value
        })
    }
}

impl Iterator for ModelIter {
    type Item = IterateStep;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted_since_solve >= 3 {
            self.emitted_since_solve = 0;
            return Some(IterateStep::NeedsSolving);
        }

        while self.cursor < self.limit {
            let candidate = self.cursor;
            self.cursor += 1;
            if self.satisfies(candidate) {
                self.emitted_since_solve += 1;
                return Some(IterateStep::Value(candidate));
            }
        }
        None
    }
}
