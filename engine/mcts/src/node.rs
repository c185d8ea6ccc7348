//! MCTS tree node representation.
//!
//! Each node represents a game state reached by taking a move from the parent.
//! Nodes store the per-player score statistics used for UCB1 selection and the
//! optimistic/pessimistic bounds used for pruning.

use engine_core::{PlayerId, MAX_SCORE, MIN_SCORE};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// Per-player interval that the final score of a node is known to lie in.
///
/// Starts as the whole score range and narrows as terminal states below the
/// node are proven.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub optimistic: Vec<f64>,
    pub pessimistic: Vec<f64>,
}

impl Bounds {
    /// Nothing known yet: `[MIN_SCORE, MAX_SCORE]` for everybody.
    pub fn unknown(player_count: usize) -> Self {
        Self {
            optimistic: vec![MAX_SCORE; player_count],
            pessimistic: vec![MIN_SCORE; player_count],
        }
    }

    /// Exact value of a proven terminal state.
    pub fn exact(scores: &[f64]) -> Self {
        Self {
            optimistic: scores.to_vec(),
            pessimistic: scores.to_vec(),
        }
    }

    /// `optimistic[p] >= pessimistic[p]` for every player.
    pub fn is_consistent(&self) -> bool {
        self.optimistic
            .iter()
            .zip(&self.pessimistic)
            .all(|(o, p)| o >= p)
    }

    /// Per-player intersection of `self` and `other`.
    pub fn tightened(&self, other: &Bounds) -> Bounds {
        Bounds {
            optimistic: self
                .optimistic
                .iter()
                .zip(&other.optimistic)
                .map(|(a, b)| a.min(*b))
                .collect(),
            pessimistic: self
                .pessimistic
                .iter()
                .zip(&other.pessimistic)
                .map(|(a, b)| a.max(*b))
                .collect(),
        }
    }

    /// The score of `player` is fully determined.
    pub fn is_proven(&self, player: PlayerId) -> bool {
        self.optimistic[player] <= self.pessimistic[player]
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode<M> {
    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// Move that led to this node from parent (None for root)
    pub mv: Option<M>,

    /// Player to move in this node's state
    pub player: PlayerId,

    /// Completed simulations that passed through this node
    pub games: u64,

    /// Per-player sum of simulation scores
    pub score: Vec<f64>,

    pub bounds: Bounds,

    /// Materialized children, in discovery order
    pub children: Vec<NodeId>,

    /// Legal moves not yet materialized. `None` until the node is expanded.
    pub unvisited: Option<Vec<M>>,

    /// Probability weights parallel to `children` when this is a chance node
    pub chance_weights: Option<Vec<f64>>,

    /// Proven never to be the best choice for the parent's player
    pub pruned: bool,

    /// The state is a finished game
    pub terminal: bool,
}

impl<M> MctsNode<M> {
    /// Create a new root node.
    pub fn new_root(player: PlayerId, player_count: usize, terminal: bool) -> Self {
        Self::new_child(NodeId::NONE, None, player, player_count, terminal)
    }

    /// Create a new child node.
    pub fn new_child(
        parent: NodeId,
        mv: Option<M>,
        player: PlayerId,
        player_count: usize,
        terminal: bool,
    ) -> Self {
        Self {
            parent,
            mv,
            player,
            games: 0,
            score: vec![0.0; player_count],
            bounds: Bounds::unknown(player_count),
            children: Vec::new(),
            unvisited: None,
            chance_weights: None,
            pruned: false,
            terminal,
        }
    }

    /// Check if the legal moves have been generated.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.unvisited.is_some()
    }

    /// Every legal move has a materialized child.
    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.unvisited.as_ref().is_some_and(Vec::is_empty)
    }

    /// Some legal moves are still waiting for their first visit.
    #[inline]
    pub fn has_unvisited(&self) -> bool {
        self.unvisited.as_ref().is_some_and(|u| !u.is_empty())
    }

    #[inline]
    pub fn is_chance(&self) -> bool {
        self.chance_weights.is_some()
    }

    /// Average score of `player` over the simulations through this node.
    /// Returns 0.0 if never visited.
    #[inline]
    pub fn mean_score(&self, player: PlayerId) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.score[player] / self.games as f64
        }
    }
}
