//! Players seated at an arena table.

use anyhow::{anyhow, Result};
use engine_core::{Board, CallSite};
use mcts::{
    PlayoutPolicy, SearchConfig, SearchError, SearchOrchestrator, SearchStats, StrengthLevel,
};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use tracing::{trace, warn};

use crate::game::ArenaGame;

/// Something that picks moves for one seat.
pub trait Agent<G: ArenaGame> {
    /// Move for the player to move in `game`.
    fn choose(&mut self, game: &G, rng: &mut ChaCha20Rng) -> Result<G::Move>;

    /// A move was played at the table, by this seat or any other.
    fn observe(&mut self, _mv: &G::Move) {}

    /// Search counters accumulated so far, if this agent searches.
    fn stats(&self) -> Option<&SearchStats> {
        None
    }
}

/// Plays uniformly random legal moves.
#[derive(Debug, Default)]
pub struct RandomAgent;

impl<G: ArenaGame> Agent<G> for RandomAgent {
    fn choose(&mut self, game: &G, rng: &mut ChaCha20Rng) -> Result<G::Move> {
        game.legal_moves(CallSite::TreePolicy)
            .choose(rng)
            .cloned()
            .ok_or_else(|| anyhow!("no legal moves for player {}", game.current_player()))
    }
}

/// Plays the move chosen by a determinized tree search.
pub struct SearchAgent<G: ArenaGame> {
    orchestrator: SearchOrchestrator<G, Box<dyn PlayoutPolicy<G>>>,
    strength: Option<StrengthLevel>,
    totals: SearchStats,
}

impl<G: ArenaGame> SearchAgent<G> {
    pub fn new(
        config: SearchConfig,
        policy: Box<dyn PlayoutPolicy<G>>,
        strength: Option<StrengthLevel>,
    ) -> Result<Self> {
        Ok(Self {
            orchestrator: SearchOrchestrator::new(config, policy)?,
            strength,
            totals: SearchStats::default(),
        })
    }
}

impl<G: ArenaGame> Agent<G> for SearchAgent<G> {
    fn choose(&mut self, game: &G, rng: &mut ChaCha20Rng) -> Result<G::Move> {
        if let Some(level) = self.strength {
            self.orchestrator
                .set_determinizations(level.determinizations_for(game.remaining()))?;
        }

        let decision = match self.orchestrator.decide(&game.view()) {
            Ok(decision) => decision,
            Err(e @ (SearchError::NoLegalMoves | SearchError::NoRootChild)) => {
                warn!(error = %e, "search failed, playing a random move");
                return Agent::<G>::choose(&mut RandomAgent, game, rng);
            }
            Err(e) => return Err(e.into()),
        };
        trace!(
            player = game.current_player(),
            chosen = ?decision.mv,
            iterations = decision.stats.iterations,
            "search agent moved"
        );
        self.totals.absorb(&decision.stats);
        self.totals.elapsed_ms += decision.stats.elapsed_ms;
        Ok(decision.mv)
    }

    fn observe(&mut self, mv: &G::Move) {
        self.orchestrator.advance(mv);
    }

    fn stats(&self) -> Option<&SearchStats> {
        Some(&self.totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayoutKind;
    use games_tictactoe::TicTacToe;
    use rand::SeedableRng;

    #[test]
    fn test_random_agent_plays_legal_moves() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut agent = RandomAgent;
        let mut board = TicTacToe::new();
        while !board.is_terminal() {
            let mv = Agent::<TicTacToe>::choose(&mut agent, &board, &mut rng).unwrap();
            assert!(board.legal_moves(CallSite::TreePolicy).contains(&mv));
            board.apply(&mv);
        }
    }

    #[test]
    fn test_search_agent_takes_the_win() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let board = TicTacToe::from_rows(["XX.", "OO.", "..."]).unwrap();
        let policy = TicTacToe::playout_policy(PlayoutKind::Random).unwrap();
        let config = SearchConfig::for_testing().with_iterations(1000);
        let mut agent = SearchAgent::new(config, policy, None).unwrap();

        assert_eq!(agent.choose(&board, &mut rng).unwrap(), 2);
        let stats = agent.stats().unwrap();
        assert_eq!(stats.iterations, 1000);
    }
}
