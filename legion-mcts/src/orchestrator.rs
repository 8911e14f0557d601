//! The MCTS orchestrator: selection, simulation, expansion, propagation
//!
//! ## Architecture
//! - Level 1: [`Orchestrator::run`] - reads like a table of contents:
//!   initialise once, then loop the four-step round while budget remains
//! - Level 2: [`selection`], [`Orchestrator::simulation`], [`expansion`],
//!   [`propagate_selection_path`], [`propagate_execution_traces`]
//! - Level 3: [`has_budget`], [`record_simulation`]
//!
//! Transliterated from `run`/`initialisation`/`has_budget`/`mcts`/
//! `selection`/`tree_policy`/`simulation`/`binary_execute`/`expansion`/
//! `integrate_path`/`propagation`/`propagate_selection_path`/
//! `propagate_execution_traces` in the original tool, one function at a
//! time, onto the `Tree`/`SymEngine`/Runner seams this workspace already
//! has.

use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};

use legion_core::{ByteInput, RunConfig, RunState, Trace};
use legion_runner::ExecutionOutcome;
use legion_symex::SymEngine;
use legion_tree::{colour_white, ChildKey, Colour, NodeId, Tree};

use crate::error::LegionError;
use crate::sampler;
use crate::sink::ArtefactSink;

/// Drives one fuzzing run to completion against a pluggable symbolic engine
/// and target binary.
pub struct Orchestrator<'a> {
    engine: &'a dyn SymEngine,
    binary: &'a Path,
}

impl<'a> Orchestrator<'a> {
    pub fn new(engine: &'a dyn SymEngine, binary: &'a Path) -> Self {
        Self { engine, binary }
    }

    /// `Legion.py`'s `run()`: initialise the tree from `seeds` (or
    /// uninformed random fuzzing if empty), then loop MCTS rounds while
    /// [`has_budget`] holds.
    pub fn run(
        &self,
        config: &RunConfig,
        state: &mut RunState,
        seeds: Vec<ByteInput>,
        sink: &mut dyn ArtefactSink,
    ) -> Result<Tree, LegionError> {
        let mut tree = Tree::new_placeholder();
        self.initialise(&mut tree, config, state, seeds, sink)?;

        while has_budget(&tree, config, state) {
            self.round(&mut tree, config, state, sink)?;
            state.round += 1;
        }

        Ok(tree)
    }

    /// `initialisation()`: execute the seed (or random) batch, use its
    /// agreed entry address to dye the root, then run Expansion and
    /// Propagation exactly as a normal round would - starting the
    /// selection-path walk at the root's own Gold child, since there is no
    /// prior selection to have produced a node.
    fn initialise(
        &self,
        tree: &mut Tree,
        config: &RunConfig,
        state: &mut RunState,
        seeds: Vec<ByteInput>,
        sink: &mut dyn ArtefactSink,
    ) -> Result<(), LegionError> {
        let mutants = if !seeds.is_empty() {
            seeds
        } else {
            sampler::uninformed_batch(config, &mut state.rng)
        };

        let batch = self.simulation(&mutants, config, state)?;
        if batch.is_empty() {
            return Err(LegionError::EmptyInitialBatch);
        }

        let main_addr = *batch[0]
            .1
            .trace
            .first()
            .ok_or(LegionError::EmptyInitialBatch)?;
        if !batch
            .iter()
            .all(|(_, outcome)| outcome.trace.first() == Some(&main_addr))
        {
            return Err(LegionError::InconsistentEntry);
        }

        let entry_state = self.engine.load_entry()?;
        tree.initialise_root(main_addr, entry_state)?;

        let traces: Vec<Trace> = batch.iter().map(|(_, o)| o.trace.clone()).collect();
        let are_new = expansion(tree, &traces);

        let root = tree.root();
        let gold = simulation_child(tree, root);
        propagate_selection_path(tree, gold, are_new.len() as u64);
        propagate_execution_traces(tree, &traces, &are_new);

        record_batch(sink, &batch, &are_new)?;
        Ok(())
    }

    /// `mcts()`: one full Selection / Simulation / Expansion / Propagation
    /// cycle. A `None` from [`selection`] is the "restart" signal (the
    /// original's `node is ROOT` check) - the tree discovered it was fully
    /// explored partway through descent, and there is nothing left to do
    /// this round.
    fn round(
        &self,
        tree: &mut Tree,
        config: &RunConfig,
        state: &mut RunState,
        sink: &mut dyn ArtefactSink,
    ) -> Result<(), LegionError> {
        let Some(node) = selection(tree, self.engine, config, &mut state.rng)? else {
            return Ok(());
        };
        debug!(?node, "selected");

        state.solving_count += 1;
        let mutants = sampler::sample(tree, self.engine, node, config, &mut state.rng)?;
        let batch = self.simulation(&mutants, config, state)?;

        let traces: Vec<Trace> = batch.iter().map(|(_, o)| o.trace.clone()).collect();
        let are_new = expansion(tree, &traces);

        propagate_selection_path(tree, node, are_new.len() as u64);
        propagate_execution_traces(tree, &traces, &are_new);

        record_batch(sink, &batch, &are_new)?;
        Ok(())
    }

    /// `simulation()` / `binary_execute()`: run every mutant against the
    /// target. Execution of the batch stops as soon as a bug is observed -
    /// `Legion.py` filters the list comprehension on `not FOUND_BUG` as it
    /// iterates, which in practice means later mutants in the same batch are
    /// never executed once an earlier one trips the bug, independent of
    /// `coverage_only` (that flag only gates whether a *further round*
    /// starts, via [`has_budget`]).
    fn simulation(
        &self,
        mutants: &[ByteInput],
        config: &RunConfig,
        state: &mut RunState,
    ) -> Result<Vec<(ByteInput, ExecutionOutcome)>, LegionError> {
        let mut results = Vec::with_capacity(mutants.len());
        for mutant in mutants {
            if state.bug_found {
                break;
            }
            let outcome = legion_runner::execute(
                self.binary,
                mutant,
                config.exec_timeout,
                config.bug_return_code,
            )?;
            if outcome.bug_found {
                state.bug_found = true;
                warn!("bug found");
            }
            results.push((mutant.clone(), outcome));
        }
        Ok(results)
    }
}

/// `has_budget()`: whether another round should start.
pub fn has_budget(tree: &Tree, config: &RunConfig, state: &RunState) -> bool {
    let root = tree.root();
    let still_hunting = config.coverage_only || !state.bug_found;
    let under_path_budget = config
        .max_paths
        .map_or(true, |max| tree.get(root).sim_win < max);
    let under_round_budget = config.max_rounds.map_or(true, |max| state.round < max);
    let tree_not_exhausted = tree.score(root, config) > f64::NEG_INFINITY;

    still_hunting && under_path_budget && tree_not_exhausted && under_round_budget
}

/// `selection()` / `tree_policy()`: descend the tree by repeatedly taking
/// the best-scoring child, colouring White nodes and marking leaves fully
/// explored as it goes, until a Gold node is reached. `None` mirrors the
/// original's sentinel "return ROOT" - the descent found the tree (or the
/// subtree it was in) fully explored before reaching a Gold node.
fn selection(
    tree: &mut Tree,
    engine: &dyn SymEngine,
    config: &RunConfig,
    rng: &mut impl Rng,
) -> Result<Option<NodeId>, LegionError> {
    let mut node = tree.root();

    loop {
        if tree.get(node).colour.is_gold() {
            return Ok(Some(node));
        }

        // Must check before dyeing: a phantom sibling added while dyeing
        // would otherwise be wrongly caught by this leaf check.
        if tree.get(node).is_leaf() {
            tree.mark_fully_explored(node);
        }

        if tree.get(node).colour.is_white() {
            colour_white(tree, engine, node)?;
        }

        if tree.get(node).children.is_empty() {
            info!(?node, "leaf reached, fully explored");
            tree.get_mut(node).fully_explored = true;
            if let Some(parent) = tree.get(node).parent {
                tree.mark_fully_explored(parent);
            }
        }

        if tree.get(node).fully_explored {
            return Ok(None);
        }

        node = tree.best_child(node, config, rng).ok_or_else(|| {
            legion_tree::TreeError::Invariant(format!(
                "node {:?} has children but best_child found none",
                node
            ))
        })?;
    }
}

/// `expansion()` / `integrate_path()`: fold every trace into the tree,
/// reporting whether each one visited a node for the first time.
fn expansion(tree: &mut Tree, traces: &[Trace]) -> Vec<bool> {
    traces.iter().map(|trace| integrate_path(tree, trace)).collect()
}

fn integrate_path(tree: &mut Tree, trace: &Trace) -> bool {
    let root = tree.root();
    debug_assert_eq!(trace.first().copied(), Some(tree.get(root).addr));

    let mut node = root;
    let mut is_new = false;
    for &addr in &trace[1..] {
        let (is_new_child, child) = tree.match_child(node, addr);
        is_new = is_new || is_new_child;
        node = child;
    }

    // An unvisited Red leaf (a freshly materialized phantom) is itself a new
    // path even when every address along the way had already been seen.
    is_new = is_new || tree.get(node).sim_try == 0;
    if tree.get(node).sim_try == 0 {
        tree.get_mut(node).sim_try = 1;
    }
    is_new
}

/// `propagate_selection_path()`: back-propagate the number of traces
/// executed to every ancestor of `start` (inclusive), starting at the Gold
/// node that was actually sampled.
fn propagate_selection_path(tree: &mut Tree, start: NodeId, delta: u64) {
    let mut current = Some(start);
    while let Some(id) = current {
        tree.get_mut(id).sel_try += delta;
        current = tree.get(id).parent;
    }
}

/// `propagate_execution_traces()`: forward-propagate each trace along the
/// path it actually took, then mark its terminal node fully explored (it was
/// just fuzzed and produced no further divergence to explore).
fn propagate_execution_traces(tree: &mut Tree, traces: &[Trace], are_new: &[bool]) {
    debug_assert_eq!(traces.len(), are_new.len());
    for (trace, &is_new) in traces.iter().zip(are_new) {
        let root = tree.root();
        let mut node = root;
        record_simulation(tree, node, is_new);
        for &addr in &trace[1..] {
            node = tree.get(node).children[&ChildKey::Block(addr)];
            record_simulation(tree, node, is_new);
        }
        tree.mark_fully_explored(node);
    }
}

/// `record_simulation()`: record one node as having been traversed during
/// simulation, incrementing its Gold Simulation child in lockstep so the
/// child's own `sim_try` is never left at zero.
fn record_simulation(tree: &mut Tree, node: NodeId, is_new: bool) {
    {
        let n = tree.get_mut(node);
        if is_new {
            n.sim_win += 1;
        }
        n.sim_try += 1;
    }
    if let Colour::Red { gold } = tree.get(node).colour {
        tree.get_mut(gold).sim_try += 1;
    }
}

fn simulation_child(tree: &Tree, id: NodeId) -> NodeId {
    tree.get(id).children[&ChildKey::Simulation]
}

/// `save_news_to_file()`: hand every newly-discovered execution to the
/// sink, in order; executions that didn't contribute a new path are
/// dropped, exactly as the original only appends to its save buffers for
/// `are_new[i]`.
fn record_batch(
    sink: &mut dyn ArtefactSink,
    batch: &[(ByteInput, ExecutionOutcome)],
    are_new: &[bool],
) -> Result<(), LegionError> {
    for ((input, outcome), &is_new) in batch.iter().zip(are_new) {
        if is_new {
            sink.record(input, outcome)?;
        }
    }
    Ok(())
}
