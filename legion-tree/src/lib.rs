//! Legion Tree - the coloured MCTS search tree
//!
//! ## Architecture
//! - Level 2: [`Tree`] (arena, mutation, scoring) and [`colour_white`] (the
//!   colouring/phantom-discovery protocol)
//! - Level 3: [`Node`], [`Colour`], [`NodeId`], [`ChildKey`], and the
//!   [`score_of`](score) heuristic
//! - Level 4: [`TreeError`]

mod colour;
mod error;
mod node;
mod score;
mod tree;

pub use colour::colour_white;
pub use error::TreeError;
pub use node::{ChildKey, Colour, Node, NodeId};
pub use score::RHO;
pub use tree::Tree;
