//! Plays a match and tallies the challenger's results.

use std::time::Instant;

use anyhow::Result;
use engine_core::{Board, PlayerId};
use mcts::{SearchConfig, SearchStats, StrengthLevel};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::agent::{Agent, RandomAgent, SearchAgent};
use crate::config::{Config, Opponent, PlayoutKind};
use crate::game::ArenaGame;

/// Seed stride between games, so every seat's search gets its own stream.
const GAME_SEED_STRIDE: u64 = 1_000;

/// Outcome of a whole match, from the challenger's side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    pub game: String,
    pub opponent: String,
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// (wins + draws / 2) / games
    pub win_rate: f64,
    /// Mean of the challenger's normalised score
    pub mean_score: f64,
    pub challenger: SearchStats,
    pub elapsed_ms: u64,
}

impl MatchReport {
    fn record(&mut self, score: f64) {
        self.games += 1;
        self.mean_score += score;
        if score > 0.5 {
            self.wins += 1;
        } else if score < 0.5 {
            self.losses += 1;
        } else {
            self.draws += 1;
        }
    }

    fn finish(&mut self) {
        if self.games > 0 {
            let games = self.games as f64;
            self.mean_score /= games;
            self.win_rate = (self.wins as f64 + 0.5 * self.draws as f64) / games;
        }
    }
}

/// Everything needed to seat the players of one game.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    pub games: u32,
    pub seed: u64,
    pub opponent: Opponent,
    pub search: SearchConfig,
    pub strength: Option<StrengthLevel>,
    pub playout: PlayoutKind,
}

impl MatchSetup {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            games: config.games,
            seed: config.seed,
            opponent: config.opponent_kind()?,
            search: config.search_config()?,
            strength: config.strength_level()?,
            playout: config.playout_kind()?,
        })
    }

    fn seat<G: ArenaGame>(&self, seat: PlayerId, game_no: u32) -> Result<Box<dyn Agent<G>>> {
        let seed = self
            .seed
            .wrapping_add(game_no as u64 * GAME_SEED_STRIDE)
            .wrapping_add(seat as u64);
        let search = self.search.clone().with_seed(seed);

        let search = if G::challenger_seat(seat, game_no) {
            search
        } else {
            match self.opponent {
                Opponent::Random => return Ok(Box::new(RandomAgent)),
                Opponent::Mcts => search,
                Opponent::NoPruning => search.with_pruning(false),
            }
        };
        let policy = G::playout_policy(self.playout)?;
        Ok(Box::new(SearchAgent::new(search, policy, self.strength)?))
    }
}

/// Play `setup.games` games of `G` and report how the challenger fared.
pub fn run_match<G: ArenaGame>(setup: &MatchSetup) -> Result<MatchReport> {
    let start = Instant::now();
    let mut report = MatchReport {
        game: G::NAME.to_string(),
        opponent: setup.opponent.to_string(),
        ..MatchReport::default()
    };

    for game_no in 0..setup.games {
        let mut rng = ChaCha20Rng::seed_from_u64(setup.seed.wrapping_add(game_no as u64));
        let mut game = G::setup(&mut rng, game_no);
        let players = game.player_count();
        let mut agents = (0..players)
            .map(|seat| setup.seat::<G>(seat, game_no))
            .collect::<Result<Vec<_>>>()?;

        while !game.is_terminal() {
            let seat = game.current_player();
            let mv = agents[seat].choose(&game, &mut rng)?;
            game.apply(&mv);
            for agent in agents.iter_mut() {
                agent.observe(&mv);
            }
        }

        let scores = game.scores();
        let seat = (0..players)
            .find(|&seat| G::challenger_seat(seat, game_no))
            .unwrap_or(0);
        report.record(scores[seat]);

        for (seat, agent) in agents.iter().enumerate() {
            if G::challenger_seat(seat, game_no) {
                if let Some(stats) = agent.stats() {
                    report.challenger.absorb(stats);
                    report.challenger.elapsed_ms += stats.elapsed_ms;
                }
            }
        }

        debug!(
            game_no,
            challenger_score = scores[seat],
            wins = report.wins,
            losses = report.losses,
            "game finished"
        );
    }

    report.finish();
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        game = %report.game,
        opponent = %report.opponent,
        games = report.games,
        wins = report.wins,
        draws = report.draws,
        losses = report.losses,
        win_rate = report.win_rate,
        elapsed_ms = report.elapsed_ms,
        "match finished"
    );
    Ok(report)
}
