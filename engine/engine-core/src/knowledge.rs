//! Knowledge-base contract used to determinize hidden information
//!
//! An observer never sees the whole game. A [`Determinize`] implementation
//! holds what the observer does know (their own hand, the public history and
//! any inferences drawn from it) and turns it into complete boards that the
//! search can treat as perfect information.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use rand_chacha::ChaCha20Rng;

use crate::{Board, DeterminizationError, PlayerId};

/// Sampler of fully specified boards consistent with an observer's knowledge.
pub trait Determinize: Send + Sync {
    /// Board produced by sampling.
    type Board: Board;

    /// Unit of hidden information (a card, a tile).
    type Hidden: Copy + Debug + Eq + Hash;

    /// `false` when the sampled board is always the same, which lets the
    /// orchestrator search one shared tree instead of many private ones.
    fn has_hidden_information(&self) -> bool {
        true
    }

    /// Board in which every hidden item is assigned consistently with every
    /// known constraint.
    ///
    /// Must terminate in bounded time. An error means this attempt found no
    /// consistent assignment; callers may retry with a different RNG state.
    fn sample(&self, rng: &mut ChaCha20Rng) -> Result<Self::Board, DeterminizationError>;

    /// Board that always honours hard facts (the observer's own holdings and
    /// everything already public) and keeps every item away from players
    /// known to be excluded from it whenever such an assignment exists.
    /// Always succeeds.
    fn sample_relaxed(&self, rng: &mut ChaCha20Rng) -> Self::Board;

    /// Items `player` is known not to hold.
    fn impossible_for(&self, player: PlayerId) -> HashSet<Self::Hidden>;
}

/// Knowledge of a perfect-information game: the board itself.
#[derive(Debug, Clone)]
pub struct PerfectInformation<B> {
    board: B,
}

impl<B: Board> PerfectInformation<B> {
    pub fn new(board: B) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &B {
        &self.board
    }
}

impl<B: Board> Determinize for PerfectInformation<B> {
    type Board = B;
    type Hidden = ();

    fn has_hidden_information(&self) -> bool {
        false
    }

    fn sample(&self, _rng: &mut ChaCha20Rng) -> Result<B, DeterminizationError> {
        Ok(self.board.clone())
    }

    fn sample_relaxed(&self, _rng: &mut ChaCha20Rng) -> B {
        self.board.clone()
    }

    fn impossible_for(&self, _player: PlayerId) -> HashSet<()> {
        HashSet::new()
    }
}
