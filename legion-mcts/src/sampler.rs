//! The Sampler - turns a selected Gold node into a batch of byte inputs
//!
//! Level 2 - `spec.md` §4.E
//!
//! Constraint-guided sampling drives the Gold node's own `iterate` cursor
//! forward (resumed by `skip`-ing the number of items already consumed,
//! since `SymEngine::iterate` borrows its backend and cannot itself be
//! stored across calls - see the Gold colour payload's `cursor: usize`).
//! Uninformed sampling falls back to uniform random bytes, mirroring the
//! original's `TreeNode.mutate()` dispatch on whether `self.state` carries
//! any constraints.

use std::time::Instant;

use rand::RngCore;

use legion_core::{ByteInput, RunConfig};
use legion_symex::{IterateStep, SymEngine, SymState};
use legion_tree::{Colour, NodeId, Tree, TreeError};

/// Draw a batch of byte inputs from the Gold node `gold`, updating its
/// `accumulated_time` and `iterate` cursor (and, on stream exhaustion,
/// marking it `fully_explored` and propagating that mark).
pub fn sample(
    tree: &mut Tree,
    engine: &dyn SymEngine,
    gold: NodeId,
    config: &RunConfig,
    rng: &mut impl RngCore,
) -> Result<Vec<ByteInput>, TreeError> {
    let (state, cursor) = match &tree.get(gold).colour {
        Colour::Gold { state, cursor } => (state.clone(), *cursor),
        other => {
            return Err(TreeError::Invariant(format!(
                "sampled node {:?} is not Gold (colour {})",
                gold,
                other.name()
            )))
        }
    };

    let started = Instant::now();
    let batch = if engine.has_constraints(&state) {
        let (batch, consumed, exhausted) = constraint_guided(engine, &state, cursor, config);
        tree.get_mut(gold).colour = Colour::Gold {
            state,
            cursor: cursor + consumed,
        };
        if exhausted {
            tree.get_mut(gold).fully_explored = true;
            tree.mark_fully_explored(gold);
        }
        batch
    } else {
        uninformed(config, rng)
    };
    tree.get_mut(gold).accumulated_time += started.elapsed().as_secs_f64();

    Ok(batch)
}

/// Pull concrete assignments from `engine.iterate`, resuming at `start_cursor`
/// items in. Returns `(batch, items_consumed_this_call, stream_exhausted)`.
fn constraint_guided(
    engine: &dyn SymEngine,
    state: &SymState,
    start_cursor: usize,
    config: &RunConfig,
) -> (Vec<ByteInput>, usize, bool) {
    let mut results = Vec::new();
    let mut consumed = 0usize;
    let mut exhausted = false;

    let mut iter = engine.iterate(state).skip(start_cursor);
    loop {
        if results.len() >= config.max_samples {
            break;
        }
        match iter.next() {
            None => {
                exhausted = true;
                break;
            }
            Some(IterateStep::Value(value)) => {
                consumed += 1;
                let bits = engine.stdin_bit_width(state);
                results.push(encode_big_endian(value, bits));
            }
            Some(IterateStep::NeedsSolving) => {
                consumed += 1;
                if results.len() >= config.min_samples {
                    break;
                }
                // Not enough results yet - an extra solver call is worth it.
            }
        }
    }

    (results, consumed, exhausted)
}

/// `MIN_SAMPLES` uniformly random byte strings of `config.max_bytes` length -
/// `Legion.py`'s `TreeNode.random_fuzzing()`, used both as the fallback for
/// an unconstrained Gold node and as the initial batch when no seeds are
/// supplied.
pub fn uninformed_batch(config: &RunConfig, rng: &mut impl RngCore) -> Vec<ByteInput> {
    uninformed(config, rng)
}

fn uninformed(config: &RunConfig, rng: &mut impl RngCore) -> Vec<ByteInput> {
    (0..config.min_samples)
        .map(|_| {
            let mut bytes = vec![0u8; config.max_bytes];
            rng.fill_bytes(&mut bytes);
            bytes
        })
        .collect()
}

/// Big-endian encoding using the minimum number of bytes for `bit_width`,
/// rounded up - `Legion.py`'s `val.to_bytes(byte_len(), 'big')`.
fn encode_big_endian(value: u64, bit_width: usize) -> ByteInput {
    let byte_len = (bit_width + 7) / 8;
    let full = value.to_be_bytes();
    full[full.len() - byte_len.min(full.len())..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use legion_symex::{Branch, Cfg, ReferenceEngine};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn branch(byte_index: usize, bit: u8, value: bool) -> Branch {
        Branch { byte_index, bit, value }
    }

    #[test]
    fn unconstrained_gold_draws_min_samples_random_bytes() {
        let engine = ReferenceEngine::new(Cfg::new(0x1000));
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();
        let root = tree.root();
        let gold = tree.get(root).children[&legion_tree::ChildKey::Simulation];

        let config = RunConfig::for_tests();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let batch = sample(&mut tree, &engine, gold, &config, &mut rng).unwrap();

        assert_eq!(batch.len(), config.min_samples);
        assert!(batch.iter().all(|b| b.len() == config.max_bytes));
    }

    #[test]
    fn constrained_gold_only_yields_satisfying_values() {
        let cfg = Cfg::new(0x1000).guarded(0x1000, 0x1100, branch(0, 0, true));
        let engine = ReferenceEngine::new(cfg);
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();
        let root = tree.root();

        let (_, child) = tree.match_child(root, 0x1100);
        legion_tree::colour_white(&mut tree, &engine, child).unwrap();
        let gold = tree.get(child).children[&legion_tree::ChildKey::Simulation];

        let config = RunConfig::for_tests();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let batch = sample(&mut tree, &engine, gold, &config, &mut rng).unwrap();

        assert!(!batch.is_empty());
        for sample_bytes in &batch {
            assert_eq!(sample_bytes.len(), 1);
            assert_eq!(sample_bytes[0] & 1, 1);
        }
    }

    #[test]
    fn exhausted_stream_marks_gold_fully_explored() {
        // A single-bit constraint over a 1-byte stdin admits exactly 128
        // satisfying values (odd bytes). With `min_samples` small, each call
        // stops early at a `NeedsSolving` marker, so draining the stream
        // takes several calls resuming from the stored cursor.
        let cfg = Cfg::new(0x1000).guarded(0x1000, 0x1100, branch(0, 0, true));
        let engine = ReferenceEngine::new(cfg);
        let mut tree = Tree::new_placeholder();
        let entry = engine.load_entry().unwrap();
        tree.initialise_root(0x1000, entry).unwrap();
        let root = tree.root();

        let (_, child) = tree.match_child(root, 0x1100);
        legion_tree::colour_white(&mut tree, &engine, child).unwrap();
        let gold = tree.get(child).children[&legion_tree::ChildKey::Simulation];

        let mut config = RunConfig::for_tests();
        config.min_samples = 5;
        config.max_samples = 200;
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut total = 0usize;
        for _ in 0..100 {
            if tree.get(gold).fully_explored {
                break;
            }
            let batch = sample(&mut tree, &engine, gold, &config, &mut rng).unwrap();
            total += batch.len();
        }

        assert!(tree.get(gold).fully_explored);
        assert_eq!(total, 128);
    }
}
