//! The coloured search tree: arena, mutation, and UCB1 scoring
//!
//! Level 2 - tree operations
//!
//! Uses arena allocation (`Vec<Node>` plus `NodeId` handles) instead of
//! owning parent/child pointers, so the tree has no reference cycles and is
//! trivially dumpable - see the "Cyclic parent/child references" design
//! note.

use legion_core::{Address, RunConfig, ROOT_SENTINEL_ADDR};
use legion_symex::SymState;
use rand::Rng;

use crate::error::TreeError;
use crate::node::{ChildKey, Colour, Node, NodeId};
use crate::score::score_of;

/// The coloured MCTS search tree.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Start a tree with an un-dyed (White) placeholder root, before the
    /// first round's initialisation has assigned it `main`'s address.
    pub fn new_placeholder() -> Self {
        Self {
            nodes: vec![Node::new_white(ROOT_SENTINEL_ADDR, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// The symbolic state relevant to scoring/sampling of `id`, looking
    /// through a Red node to its Gold child (invariant 1: every Red node
    /// has exactly one Gold child sharing its address).
    pub fn sim_state(&self, id: NodeId) -> Option<&SymState> {
        match &self.get(id).colour {
            Colour::Red { gold } => self.get(*gold).own_state(),
            _ => self.get(id).own_state(),
        }
    }

    /// Re-address the root once the first batch's traces agree on
    /// `main_addr`, and dye it Red with the SymEngine's entry state -
    /// `initialisation()`'s `init_root`.
    pub fn initialise_root(&mut self, main_addr: Address, state: SymState) -> Result<(), TreeError> {
        let root = self.root();
        self.get_mut(root).addr = main_addr;
        self.dye_red(root, state)
    }

    /// Dye a White node Red, creating its Gold Simulation child.
    ///
    /// Invariant 1: a Red node has exactly one child keyed `Simulation`; it
    /// is Gold and shares `addr` with its parent.
    pub fn dye_red(&mut self, id: NodeId, state: SymState) -> Result<(), TreeError> {
        if !self.get(id).colour.is_white() {
            return Err(TreeError::Invariant(format!(
                "attempted to re-dye non-White node {:?}",
                id
            )));
        }
        debug_assert!(self.get(id).colour.is_white());

        let addr = self.get(id).addr;
        let gold = self.push(Node {
            colour: Colour::Gold { state, cursor: 0 },
            ..Node::new_white(addr, Some(id))
        });

        debug_assert!(!self.get(id).children.contains_key(&ChildKey::Simulation));
        self.get_mut(id)
            .children
            .insert(ChildKey::Simulation, gold);
        self.get_mut(id).colour = Colour::Red { gold };
        Ok(())
    }

    /// Dye a White node Black, attaching the given symbolic state.
    pub fn dye_black(&mut self, id: NodeId, state: SymState) -> Result<(), TreeError> {
        if !self.get(id).colour.is_white() {
            return Err(TreeError::Invariant(format!(
                "attempted to re-dye non-White node {:?}",
                id
            )));
        }
        self.get_mut(id).colour = Colour::Black { state };
        Ok(())
    }

    /// Create a new Red phantom child of `parent` carrying `state`, for a
    /// successor the colouring protocol found but no trace has reached
    /// yet.
    pub fn add_phantom(
        &mut self,
        parent: NodeId,
        addr: Address,
        state: SymState,
    ) -> Result<NodeId, TreeError> {
        if self.get(parent).children.contains_key(&ChildKey::Block(addr)) {
            return Err(TreeError::Invariant(format!(
                "phantom address {:#x} already a child of {:?}",
                addr, parent
            )));
        }
        let child = self.push(Node::new_white(addr, Some(parent)));
        self.get_mut(parent)
            .children
            .insert(ChildKey::Block(addr), child);
        self.dye_red(child, state)?;
        self.get_mut(child).phantom = true;
        Ok(child)
    }

    /// Match `addr` against an existing child of `parent`, or create a new
    /// White child for it. Returns `(is_new_path, child_id)`: true either
    /// when a fresh child was created, or when the matched child was a
    /// phantom being reached for the first time (its `phantom` flag is
    /// cleared as a side effect).
    pub fn match_child(&mut self, parent: NodeId, addr: Address) -> (bool, NodeId) {
        if let Some(&child) = self.get(parent).children.get(&ChildKey::Block(addr)) {
            let was_phantom = self.get(child).phantom;
            self.get_mut(child).phantom = false;
            return (was_phantom, child);
        }

        let child = self.push(Node::new_white(addr, Some(parent)));
        self.get_mut(parent)
            .children
            .insert(ChildKey::Block(addr), child);
        (true, child)
    }

    /// UCB1-with-time-penalty score of `id` (`spec.md` §4.C). `+inf` for the
    /// root and for never-selected non-fully-explored nodes; `-inf` once
    /// `fully_explored` is set.
    pub fn score(&self, id: NodeId, config: &RunConfig) -> f64 {
        score_of(self, id, config)
    }

    /// A uniformly random element of `argmax score(child)` over every child
    /// of `id` (Gold included - it is the child that actually samples).
    pub fn best_child<R: Rng>(&self, id: NodeId, config: &RunConfig, rng: &mut R) -> Option<NodeId> {
        let mut best_score = f64::NEG_INFINITY;
        let mut candidates: Vec<NodeId> = Vec::new();

        for &child in self.get(id).children.values() {
            let s = self.score(child, config);
            if s > best_score {
                best_score = s;
                candidates.clear();
                candidates.push(child);
            } else if s == best_score {
                candidates.push(child);
            }
        }

        if candidates.is_empty() {
            None
        } else {
            Some(candidates[rng.gen_range(0..candidates.len())])
        }
    }

    /// Bottom-up fixpoint propagation of `fully_explored` (`spec.md` §4.C).
    ///
    /// Never propagates through a White node. A node is eligible only if
    /// every non-Gold child is marked, and - for a Red node - it has been
    /// selected at least once (so a phantom always gets one sampling
    /// chance before its subtree can be pruned away).
    pub fn mark_fully_explored(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.get(node_id).colour.is_white() {
                return;
            }

            let all_children_done = self
                .get(node_id)
                .children
                .iter()
                .filter(|(key, _)| !matches!(key, ChildKey::Simulation))
                .all(|(_, &child)| self.get(child).fully_explored);
            if !all_children_done {
                return;
            }

            let is_untested_red = self.get(node_id).colour.is_red() && self.get(node_id).sel_try == 0;
            if is_untested_red {
                return;
            }

            if self.get(node_id).fully_explored {
                // Already marked; still make sure the Gold child and
                // ancestors are in sync with a repeated call.
            }
            self.get_mut(node_id).fully_explored = true;

            if let Colour::Red { gold } = self.get(node_id).colour {
                self.get_mut(gold).fully_explored = true;
            }

            current = self.get(node_id).parent;
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new_placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legion_symex::{Cfg, ReferenceEngine, SymEngine};

    fn engine() -> ReferenceEngine {
        ReferenceEngine::new(Cfg::new(0x1000))
    }

    #[test]
    fn placeholder_root_is_white_sentinel() {
        let tree = Tree::new_placeholder();
        assert_eq!(tree.get(tree.root()).addr, ROOT_SENTINEL_ADDR);
        assert!(tree.get(tree.root()).colour.is_white());
    }

    #[test]
    fn initialise_root_dyes_red_with_gold_child() {
        let mut tree = Tree::new_placeholder();
        let eng = engine();
        let state = eng.load_entry().unwrap();

        tree.initialise_root(0x1000, state).unwrap();

        let root = tree.root();
        assert_eq!(tree.get(root).addr, 0x1000);
        assert!(tree.get(root).colour.is_red());
        assert_eq!(tree.get(root).children.len(), 1);

        let gold = tree.get(root).children[&ChildKey::Simulation];
        assert!(tree.get(gold).colour.is_gold());
        assert_eq!(tree.get(gold).addr, 0x1000);
    }

    #[test]
    fn match_child_creates_white_then_matches() {
        let mut tree = Tree::new_placeholder();
        let root = tree.root();

        let (is_new, child) = tree.match_child(root, 0x2000);
        assert!(is_new);
        assert!(tree.get(child).colour.is_white());

        let (is_new_again, same_child) = tree.match_child(root, 0x2000);
        assert!(!is_new_again);
        assert_eq!(child, same_child);
    }

    #[test]
    fn phantom_clears_on_first_real_match() {
        let mut tree = Tree::new_placeholder();
        let root = tree.root();
        let eng = engine();
        let state = eng.load_entry().unwrap();

        let phantom = tree.add_phantom(root, 0x3000, state).unwrap();
        assert!(tree.get(phantom).phantom);

        let (is_new, matched) = tree.match_child(root, 0x3000);
        assert_eq!(matched, phantom);
        assert!(is_new, "first real trace through a phantom counts as new");
        assert!(!tree.get(phantom).phantom);
    }

    #[test]
    fn fully_explored_does_not_propagate_through_white() {
        let mut tree = Tree::new_placeholder();
        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x4000);
        // child is White; marking it directly should not propagate to root.
        tree.get_mut(child).fully_explored = true;
        tree.mark_fully_explored(child);
        assert!(!tree.get(root).fully_explored);
    }

    #[test]
    fn untested_red_child_blocks_parent_from_being_marked() {
        let mut tree = Tree::new_placeholder();
        let eng = engine();
        let state = eng.load_entry().unwrap();
        tree.initialise_root(0x1000, state.clone()).unwrap();
        let root = tree.root();

        let (_, child) = tree.match_child(root, 0x5000);
        tree.dye_red(child, state).unwrap();
        // sel_try == 0 on the Red child: must not be eligible yet.
        tree.mark_fully_explored(child);
        assert!(!tree.get(child).fully_explored);
    }
}
