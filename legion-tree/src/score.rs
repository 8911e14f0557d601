//! UCB1-with-time-penalty scoring
//!
//! Level 3 - selection heuristic
//!
//! Matches the original's `TreeNode.score()` bit for bit, including its
//! hard-coded `+ 1` in the exploration denominator - changing it would shift
//! every node's balance between exploitation and exploration, so it is kept
//! exactly rather than "fixed" to the textbook UCB1 form.

use legion_core::RunConfig;

use crate::node::{Colour, NodeId};
use crate::tree::Tree;

/// Exploration weight, the standard `1/sqrt(2)` UCB1 constant.
pub const RHO: f64 = std::f64::consts::FRAC_1_SQRT_2;

pub(crate) fn score_of(tree: &Tree, id: NodeId, config: &RunConfig) -> f64 {
    let node = tree.get(id);

    // `fully_explored` takes priority over the root special-case: a fully
    // explored root must score `-inf` so `has_budget`'s `root.score() > -inf`
    // check can observe whole-tree termination (`spec.md` §4.F, §8 I4).
    if node.fully_explored {
        return f64::NEG_INFINITY;
    }
    if node.sel_try == 0 {
        return f64::INFINITY;
    }
    if node.parent.is_none() {
        return f64::INFINITY;
    }

    let parent_sel_try = node
        .parent
        .map(|p| tree.get(p).sel_try)
        .unwrap_or(node.sel_try);

    let exploit = node.sim_win as f64 / node.sel_try as f64;
    let explore = (2.0 * (parent_sel_try as f64).ln() / (node.sim_try as f64 + 1.0)).sqrt();

    let min_samples_log = (config.min_samples as f64).log2().ceil();
    let denom = (min_samples_log + node.sel_try as f64 - 1.0).max(1.0);
    let avg_solve_time = node.accumulated_time / denom;

    let expected_samples =
        (config.min_samples as f64 * 2f64.powi(node.sel_try as i32)).min(config.max_samples as f64);
    let penalty = config.time_coeff * avg_solve_time / expected_samples;

    exploit + 2.0 * RHO * explore - penalty
}

/// True if `colour` participates in `fully_explored` propagation as a leaf
/// (used by callers that need to distinguish Gold bookkeeping children from
/// real tree structure without borrowing the whole `Tree`).
pub(crate) fn counts_toward_exploration(colour: &Colour) -> bool {
    !matches!(colour, Colour::Gold { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use legion_symex::{Cfg, ReferenceEngine, SymEngine};

    fn fresh_tree() -> (Tree, ReferenceEngine) {
        let engine = ReferenceEngine::new(Cfg::new(0x1000));
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();
        (tree, engine)
    }

    #[test]
    fn root_scores_positive_infinity() {
        let (tree, _engine) = fresh_tree();
        let config = RunConfig::for_tests();
        assert_eq!(tree.score(tree.root(), &config), f64::INFINITY);
    }

    #[test]
    fn never_selected_child_scores_positive_infinity() {
        let (mut tree, _engine) = fresh_tree();
        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x2000);
        let config = RunConfig::for_tests();
        assert_eq!(tree.score(child, &config), f64::INFINITY);
    }

    #[test]
    fn fully_explored_root_scores_negative_infinity() {
        // fully_explored must outrank the root special-case, or
        // `has_budget`'s termination check could never fire.
        let (mut tree, _engine) = fresh_tree();
        let root = tree.root();
        tree.get_mut(root).fully_explored = true;
        let config = RunConfig::for_tests();
        assert_eq!(tree.score(root, &config), f64::NEG_INFINITY);
    }

    #[test]
    fn fully_explored_child_scores_negative_infinity() {
        let (mut tree, _engine) = fresh_tree();
        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x2000);
        tree.get_mut(child).fully_explored = true;
        let config = RunConfig::for_tests();
        assert_eq!(tree.score(child, &config), f64::NEG_INFINITY);
    }

    #[test]
    fn selected_child_score_is_finite_and_uses_time_penalty() {
        let (mut tree, _engine) = fresh_tree();
        let root = tree.root();
        let (_, child) = tree.match_child(root, 0x2000);

        {
            let parent_node = tree.get_mut(root);
            parent_node.sel_try = 4;
        }
        {
            let node = tree.get_mut(child);
            node.sel_try = 2;
            node.sim_try = 2;
            node.sim_win = 1;
            node.accumulated_time = 3.0;
        }

        let mut config = RunConfig::for_tests();
        config.time_coeff = 1.0;
        let with_penalty = tree.score(child, &config);

        config.time_coeff = 0.0;
        let without_penalty = tree.score(child, &config);

        assert!(with_penalty.is_finite());
        assert!(without_penalty.is_finite());
        assert!(with_penalty < without_penalty);
    }
}
