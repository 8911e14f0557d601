//! Tree node types: identifiers, colour, and per-node statistics
//!
//! Level 3 - node accessors and data
//!
//! Colour is modeled as a tagged enum carrying colour-specific payload
//! (the Gold Simulation child's handle, the attached symbolic state, the
//! sampling cursor) rather than optional fields shared across all colours -
//! see the "Colour/phantom polymorphism" design note.

use legion_symex::SymState;

/// Node identifier: a stable index into the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A child slot key: either a real block address, or the single literal
/// `Simulation` slot a Red node's Gold child occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKey {
    Block(i64),
    Simulation,
}

/// The colour of a tree node and the data that colour carries.
#[derive(Clone, Debug)]
pub enum Colour {
    /// Discovered by a trace but not yet classified by symbolic
    /// single-step.
    White,
    /// A real node that diverges; its symbolic state lives in its Gold
    /// Simulation child.
    Red { gold: NodeId },
    /// The virtual Simulation child of a Red node: owns the symbolic state
    /// and sampling cursor used for sampling.
    Gold { state: SymState, cursor: usize },
    /// A real node whose parent state has exactly one feasible successor.
    Black { state: SymState },
}

impl Colour {
    pub fn is_white(&self) -> bool {
        matches!(self, Colour::White)
    }

    pub fn is_gold(&self) -> bool {
        matches!(self, Colour::Gold { .. })
    }

    pub fn is_red(&self) -> bool {
        matches!(self, Colour::Red { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Colour::White => "White",
            Colour::Red { .. } => "Red",
            Colour::Gold { .. } => "Gold",
            Colour::Black { .. } => "Black",
        }
    }
}

/// A node in the coloured search tree.
#[derive(Clone, Debug)]
pub struct Node {
    pub addr: i64,
    pub parent: Option<NodeId>,
    pub children: rustc_hash::FxHashMap<ChildKey, NodeId>,
    pub colour: Colour,
    /// True until the first concrete trace reaches this node; only
    /// meaningful for Red nodes materialized by the colouring protocol.
    pub phantom: bool,

    pub sel_try: u64,
    /// Reserved: never incremented by this design. See DESIGN.md.
    pub sel_win: u64,
    pub sim_try: u64,
    pub sim_win: u64,
    pub accumulated_time: f64,
    pub fully_explored: bool,
}

impl Node {
    pub fn new_white(addr: i64, parent: Option<NodeId>) -> Self {
        Self {
            addr,
            parent,
            children: rustc_hash::FxHashMap::default(),
            colour: Colour::White,
            phantom: false,
            sel_try: 0,
            sel_win: 0,
            sim_try: 0,
            sim_win: 0,
            accumulated_time: 0.0,
            fully_explored: false,
        }
    }

    /// The symbolic state relevant to scoring and sampling, if any.
    ///
    /// Red -> its Gold child's state (looked up by the caller, since a
    /// `Node` cannot see its own tree); Gold/Black -> its own state;
    /// White -> none. This function only handles the Gold/Black/White
    /// cases; the Red case is resolved by `Tree::sim_state`, which has
    /// access to the arena.
    pub fn own_state(&self) -> Option<&SymState> {
        match &self.colour {
            Colour::Gold { state, .. } => Some(state),
            Colour::Black { state } => Some(state),
            Colour::White | Colour::Red { .. } => None,
        }
    }

    /// A node is a leaf if it has no children, or its only children are
    /// Gold (the Simulation child never counts as a "real" descendant to
    /// select into during tree descent).
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
            || self
                .children
                .keys()
                .all(|key| matches!(key, ChildKey::Simulation))
    }
}
