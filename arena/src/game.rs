//! Games the arena knows how to set up and seat.

use anyhow::{bail, Result};
use engine_core::{Board, CallSite, Determinize, PerfectInformation, PlayerId};
use games_jass::{JassGame, JassHeuristic, JassKnowledge, TEAM_OF};
use games_tictactoe::TicTacToe;
use mcts::{HeuristicPlayout, PlayoutPolicy, RandomRollout};
use rand_chacha::ChaCha20Rng;

use crate::config::PlayoutKind;

/// A game the arena can play a match of.
pub trait ArenaGame: Board {
    /// What the player to move knows about the game
    type View: Determinize<Board = Self>;

    const NAME: &'static str;

    /// Fresh game number `game_no` of a match.
    fn setup(rng: &mut ChaCha20Rng, game_no: u32) -> Self;

    /// Knowledge of the player to move.
    fn view(&self) -> Self::View;

    /// Decisions still ahead, used to scale strength presets.
    fn remaining(&self) -> usize;

    /// Whether `seat` plays for the challenger in game `game_no`.
    ///
    /// Sides swap every game so neither keeps the first move.
    fn challenger_seat(seat: PlayerId, game_no: u32) -> bool;

    fn playout_policy(kind: PlayoutKind) -> Result<Box<dyn PlayoutPolicy<Self>>>;
}

impl ArenaGame for TicTacToe {
    type View = PerfectInformation<TicTacToe>;

    const NAME: &'static str = "tictactoe";

    fn setup(_rng: &mut ChaCha20Rng, _game_no: u32) -> Self {
        TicTacToe::new()
    }

    fn view(&self) -> Self::View {
        PerfectInformation::new(*self)
    }

    fn remaining(&self) -> usize {
        self.legal_moves(CallSite::TreePolicy).len()
    }

    fn challenger_seat(seat: PlayerId, game_no: u32) -> bool {
        seat == (game_no % 2) as PlayerId
    }

    fn playout_policy(kind: PlayoutKind) -> Result<Box<dyn PlayoutPolicy<Self>>> {
        match kind {
            PlayoutKind::Random => Ok(Box::new(RandomRollout)),
            PlayoutKind::Heuristic => bail!("tictactoe has no heuristic playout"),
        }
    }
}

impl ArenaGame for JassGame {
    type View = JassKnowledge;

    const NAME: &'static str = "jass";

    fn setup(rng: &mut ChaCha20Rng, game_no: u32) -> Self {
        JassGame::deal(rng, (game_no % 4) as PlayerId)
    }

    fn view(&self) -> Self::View {
        JassKnowledge::from_game(self, self.current_player())
    }

    fn remaining(&self) -> usize {
        self.tricks_left()
    }

    fn challenger_seat(seat: PlayerId, game_no: u32) -> bool {
        TEAM_OF[seat] == (game_no % 2) as usize
    }

    fn playout_policy(kind: PlayoutKind) -> Result<Box<dyn PlayoutPolicy<Self>>> {
        Ok(match kind {
            PlayoutKind::Random => Box::new(RandomRollout),
            PlayoutKind::Heuristic => Box::new(HeuristicPlayout::new(JassHeuristic::new())),
        })
    }
}
