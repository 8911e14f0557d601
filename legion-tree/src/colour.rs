//! The colouring / phantom-discovery protocol
//!
//! Level 2 - turns a freshly discovered White node into Black, Red (plus
//! any Red siblings the same divergence reveals), or a closed-off dead end,
//! by single-stepping symbolic execution from the parent's state.
//!
//! Mirrors the original's `symex_to_match` / `match_node_states` /
//! `add_phantom`: walk forced (singleton) successors until either the
//! target's own address is reached or a real divergence is found, then
//! materialize every sibling that divergence reveals - even ones no trace
//! has reached yet (phantoms) - before any of them is ever selected.

use legion_symex::{SymEngine, SymState};

use crate::error::TreeError;
use crate::node::{ChildKey, NodeId};
use crate::tree::Tree;

/// Classify a White node discovered by a concrete trace.
///
/// `white_id`'s parent must already carry a symbolic state (it is Red,
/// Gold, or Black). On success `white_id` itself, and any sibling the same
/// divergence reveals, are no longer White.
pub fn colour_white(
    tree: &mut Tree,
    engine: &dyn SymEngine,
    white_id: NodeId,
) -> Result<(), TreeError> {
    let parent_id = tree.get(white_id).parent.ok_or_else(|| {
        TreeError::Invariant("cannot colour a node with no parent".to_string())
    })?;
    let target_addr = tree.get(white_id).addr;

    let mut state = tree
        .sim_state(parent_id)
        .cloned()
        .ok_or_else(|| {
            TreeError::Invariant(format!(
                "parent {:?} has no symbolic state to single-step from",
                parent_id
            ))
        })?;

    let successors = loop {
        let successors = engine.step(&state)?;
        if successors.len() != 1 {
            break successors;
        }
        if successors[0].addr() == target_addr {
            break successors;
        }
        state = successors[0].clone();
    };

    match successors.len() {
        0 => {
            // The forced chain ran off the end of the program without ever
            // reaching `target_addr`: nothing more can happen here. `white_id`
            // itself stays White, so the fixpoint must start at its parent -
            // calling it on `white_id` would return immediately (White nodes
            // are never eligible) and never reach the ancestors.
            tree.get_mut(white_id).fully_explored = true;
            tree.mark_fully_explored(parent_id);
            Ok(())
        }
        1 => {
            let only = successors.into_iter().next().unwrap();
            debug_assert_eq!(only.addr(), target_addr);
            tree.dye_black(white_id, only)
        }
        _ => dye_siblings(tree, parent_id, white_id, successors),
    }
}

/// A genuine divergence: colour every matching existing child Red with its
/// state, and phantom-materialize any state that has no child yet.
fn dye_siblings(
    tree: &mut Tree,
    parent_id: NodeId,
    white_id: NodeId,
    successors: Vec<SymState>,
) -> Result<(), TreeError> {
    let mut matched_white = false;

    for state in successors {
        let addr = state.addr();
        let existing = tree
            .get(parent_id)
            .children
            .get(&ChildKey::Block(addr))
            .copied();

        match existing {
            Some(child) if tree.get(child).colour.is_white() => {
                tree.dye_red(child, state)?;
                if child == white_id {
                    matched_white = true;
                }
            }
            Some(_) => {
                // Already classified by a prior discovery at this parent.
            }
            None => {
                tree.add_phantom(parent_id, addr, state)?;
            }
        }
    }

    if !matched_white {
        return Err(TreeError::Invariant(format!(
            "divergence at parent {:?} never produced a successor at White node {:?}'s address",
            parent_id, white_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use legion_symex::{Cfg, ReferenceEngine};

    fn branch(byte_index: usize, bit: u8, value: bool) -> legion_symex::Branch {
        legion_symex::Branch { byte_index, bit, value }
    }

    #[test]
    fn forced_successor_colours_black() {
        let cfg = Cfg::new(0x1000).forced(0x1000, 0x1010);
        let engine = ReferenceEngine::new(cfg);
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();

        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x1010);
        colour_white(&mut tree, &engine, child).unwrap();

        assert!(tree.get(child).colour.is_red() == false);
        assert!(matches!(tree.get(child).colour, crate::node::Colour::Black { .. }));
    }

    #[test]
    fn divergence_colours_existing_and_phantoms_sibling() {
        let cfg = Cfg::new(0x1000)
            .guarded(0x1000, 0x1100, branch(0, 0, true))
            .guarded(0x1000, 0x1200, branch(0, 0, false));
        let engine = ReferenceEngine::new(cfg);
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();

        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x1100);
        colour_white(&mut tree, &engine, child).unwrap();

        assert!(tree.get(child).colour.is_red());
        assert!(!tree.get(child).phantom);

        let phantom = tree.get(root).children[&ChildKey::Block(0x1200)];
        assert!(tree.get(phantom).colour.is_red());
        assert!(tree.get(phantom).phantom);
    }

    #[test]
    fn dead_end_marks_fully_explored() {
        let cfg = Cfg::new(0x1000).forced(0x1000, 0x1010);
        // 0x1010 has no outgoing edges: stepping from it yields nothing.
        let engine = ReferenceEngine::new(cfg);
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();

        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x1010);
        colour_white(&mut tree, &engine, child).unwrap();
        let (_, dead_end) = tree.match_child(child, 0x9999);
        colour_white(&mut tree, &engine, dead_end).unwrap();

        assert!(tree.get(dead_end).fully_explored);
        // The mark must propagate to the Black parent, which has no other
        // children and so becomes fully explored itself.
        assert!(tree.get(child).fully_explored);
    }
}
