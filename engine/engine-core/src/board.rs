//! The `Board` trait consumed by the search engine
//!
//! A board is a fully specified, perfect-information game state. Imperfect
//! information games reach this trait only after determinization: every hidden
//! card has been assigned to somebody and the search may look at all of it.

use std::fmt::Debug;
use std::hash::Hash;

use crate::EvaluatorError;

/// Index of a player, `0..player_count()`.
pub type PlayerId = usize;

/// One score per player, each in `[MIN_SCORE, MAX_SCORE]`.
///
/// `[1.0, 0.0]` is a win for player 0, `[0.5, 0.5]` a draw. Teams are
/// expressed by giving every member the team's score.
pub type Scores = Vec<f64>;

/// Lowest score a player can receive. Used as the "worst possible" bound.
pub const MIN_SCORE: f64 = 0.0;

/// Highest score a player can receive. Used as the "best possible" bound.
pub const MAX_SCORE: f64 = 1.0;

/// Where in the search a move list is being requested from.
///
/// Some games generate a reduced move set for fast rollouts while keeping
/// the full set for the statistics-bearing part of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// Expansion of a node in the search tree.
    TreePolicy,
    /// A rollout step during simulation.
    Playout,
}

/// Main trait for game implementations
///
/// Implementations must be cheap to clone: the search clones the root board
/// once per simulation and replays moves along the selected path instead of
/// keeping a snapshot per node.
///
/// # Example
///
/// ```rust
/// use engine_core::{Board, CallSite, PlayerId, Scores};
///
/// /// Whoever takes the last stone wins.
/// #[derive(Debug, Clone)]
/// struct Nim {
///     stones: u8,
///     to_move: PlayerId,
/// }
///
/// impl Board for Nim {
///     type Move = u8;
///
///     fn current_player(&self) -> PlayerId {
///         self.to_move
///     }
///
///     fn player_count(&self) -> usize {
///         2
///     }
///
///     fn legal_moves(&self, _site: CallSite) -> Vec<u8> {
///         (1..=self.stones.min(3)).collect()
///     }
///
///     fn apply(&mut self, mv: &u8) {
///         self.stones -= mv;
///         self.to_move = 1 - self.to_move;
///     }
///
///     fn is_terminal(&self) -> bool {
///         self.stones == 0
///     }
///
///     fn scores(&self) -> Scores {
///         // The player to move has no stones left to take: they lost.
///         let mut scores = vec![1.0; 2];
///         scores[self.to_move] = 0.0;
///         scores
///     }
/// }
///
/// let mut nim = Nim { stones: 3, to_move: 0 };
/// nim.apply(&3);
/// assert!(nim.is_terminal());
/// assert_eq!(nim.scores(), vec![1.0, 0.0]);
/// ```
pub trait Board: Clone + Debug + Send + Sync + 'static {
    /// Move type - should be small and cheap to compare
    type Move: Clone + Debug + PartialEq + Eq + Hash + Send + Sync + 'static;

    /// Player whose turn it is.
    ///
    /// For chance states (see [`Board::chance_weights`]) the value is not
    /// used for selection but must still be a valid player index.
    fn current_player(&self) -> PlayerId;

    /// Number of players; the length of every score vector.
    fn player_count(&self) -> usize;

    /// Legal moves in the current state.
    ///
    /// The order must be deterministic for a given state so that seeded
    /// searches are reproducible.
    fn legal_moves(&self, site: CallSite) -> Vec<Self::Move>;

    /// Apply a move in place. Callers clone first when they need the
    /// previous state.
    fn apply(&mut self, mv: &Self::Move);

    /// Check if the game is over
    fn is_terminal(&self) -> bool;

    /// Final score vector. Only meaningful when [`Board::is_terminal`].
    fn scores(&self) -> Scores;

    /// Probability weights of the legal moves when the next transition is a
    /// chance event (a die roll, a card drawn from a shuffled stock).
    ///
    /// `None` for regular decision states. When `Some`, the vector is
    /// parallel to `legal_moves(CallSite::TreePolicy)`.
    fn chance_weights(&self) -> Option<Vec<f64>> {
        None
    }

    /// Whether [`Board::external_estimate`] should replace rollouts.
    fn has_external_evaluator(&self) -> bool {
        false
    }

    /// Estimate the final score vector without playing the game out.
    fn external_estimate(&self) -> Result<Scores, EvaluatorError> {
        Err(EvaluatorError::Unavailable)
    }
}

/// Domain knowledge that picks a move during rollouts.
///
/// Invoked only on determinized boards inside simulations, where looking at
/// every player's cards is legitimate.
pub trait MoveHeuristic<B: Board>: Send + Sync {
    /// Preferred move among `moves` (the playout move list of `board`), or
    /// `None` to let the rollout pick uniformly.
    fn choose(&self, board: &B, moves: &[B::Move]) -> Option<B::Move>;
}

/// Opaque score estimator (for example a trained value network).
pub trait ScoreEstimator<B: Board>: Send + Sync {
    /// Estimate the final score vector of `board`.
    fn estimate(&self, board: &B) -> Result<Scores, EvaluatorError>;
}
