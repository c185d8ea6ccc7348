//! Configuration for the arena
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use mcts::{FinalSelectionPolicy, Parallelism, SearchConfig, StrengthLevel};
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use engine_config::{load_config, CentralConfig};

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_game() -> String {
    CENTRAL_CONFIG.arena.game.clone()
}

fn default_games() -> u32 {
    CENTRAL_CONFIG.arena.games
}

fn default_opponent() -> String {
    CENTRAL_CONFIG.arena.opponent.clone()
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_seed() -> u64 {
    CENTRAL_CONFIG.common.seed
}

fn default_exploration() -> f64 {
    CENTRAL_CONFIG.search.exploration
}

fn default_threads() -> usize {
    CENTRAL_CONFIG.search.threads
}

fn default_determinizations() -> usize {
    CENTRAL_CONFIG.search.determinizations
}

fn default_iterations() -> u64 {
    CENTRAL_CONFIG.search.iterations
}

fn default_time_budget_ms() -> u64 {
    CENTRAL_CONFIG.search.time_budget_ms
}

fn default_final_selection() -> String {
    CENTRAL_CONFIG.search.final_selection.clone()
}

fn default_parallelism() -> String {
    CENTRAL_CONFIG.search.parallelism.clone()
}

fn default_pruning() -> bool {
    CENTRAL_CONFIG.search.pruning
}

fn default_playouts() -> u32 {
    CENTRAL_CONFIG.search.playouts
}

fn default_optimistic_bias() -> f64 {
    CENTRAL_CONFIG.search.optimistic_bias
}

fn default_pessimistic_bias() -> f64 {
    CENTRAL_CONFIG.search.pessimistic_bias
}

fn default_determinization_attempts() -> u32 {
    CENTRAL_CONFIG.search.determinization_attempts
}

fn default_playout() -> String {
    CENTRAL_CONFIG.search.playout.clone()
}

/// Game played by the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    TicTacToe,
    Jass,
}

impl FromStr for GameKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tictactoe" | "tic-tac-toe" => Ok(Self::TicTacToe),
            "jass" | "cards" => Ok(Self::Jass),
            other => Err(anyhow!(
                "unknown game '{}', expected tictactoe or jass",
                other
            )),
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TicTacToe => "tictactoe",
            Self::Jass => "jass",
        })
    }
}

/// Who the configured search plays against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opponent {
    /// Same search configuration
    Mcts,
    /// Uniformly random legal moves
    Random,
    /// Same search configuration with bound pruning disabled
    NoPruning,
}

impl FromStr for Opponent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "mcts" | "self" => Ok(Self::Mcts),
            "random" => Ok(Self::Random),
            "no-pruning" | "nopruning" => Ok(Self::NoPruning),
            other => Err(anyhow!(
                "unknown opponent '{}', expected mcts, random or no-pruning",
                other
            )),
        }
    }
}

impl fmt::Display for Opponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mcts => "mcts",
            Self::Random => "random",
            Self::NoPruning => "no-pruning",
        })
    }
}

/// Rollout policy used by the search players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutKind {
    Random,
    Heuristic,
}

impl FromStr for PlayoutKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "heuristic" => Ok(Self::Heuristic),
            other => Err(anyhow!(
                "unknown playout '{}', expected random or heuristic",
                other
            )),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "arena")]
#[command(about = "Kibitz Arena - Pit search configurations against each other")]
#[command(
    long_about = "Plays a series of games between the configured search and an opponent
(the same search, the same search without pruning, or a random player) and reports
the challenger's win rate.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Game to play (tictactoe or jass)
    #[arg(long, default_value_t = default_game())]
    pub game: String,

    /// Number of games in the match
    #[arg(long, default_value_t = default_games())]
    pub games: u32,

    /// Opponent of the configured search (mcts, random or no-pruning)
    #[arg(long, default_value_t = default_opponent())]
    pub opponent: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Base seed for deals, random players and searches
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// UCB1 exploration constant
    #[arg(long, default_value_t = default_exploration())]
    pub exploration: f64,

    /// Worker threads per search
    #[arg(long, default_value_t = default_threads())]
    pub threads: usize,

    /// Determinizations per decision (0 for one per thread)
    #[arg(long, default_value_t = default_determinizations())]
    pub determinizations: usize,

    /// Iterations per tree (0 for no iteration limit)
    #[arg(long, default_value_t = default_iterations())]
    pub iterations: u64,

    /// Thinking time per decision in milliseconds (0 for no time limit)
    #[arg(long, default_value_t = default_time_budget_ms())]
    pub time_budget_ms: u64,

    /// Final move selection (robust_child, max_child, bound_secure_child)
    #[arg(long, default_value_t = default_final_selection())]
    pub final_selection: String,

    /// Parallelism mode (auto, independent_trees, shared_tree)
    #[arg(long, default_value_t = default_parallelism())]
    pub parallelism: String,

    /// Prune children whose bounds cannot beat a sibling
    #[arg(long, default_value_t = default_pruning(), action = clap::ArgAction::Set)]
    pub pruning: bool,

    /// Playouts averaged per simulation
    #[arg(long, default_value_t = default_playouts())]
    pub playouts: u32,

    /// Weight of the optimistic bound in selection
    #[arg(long, default_value_t = default_optimistic_bias())]
    pub optimistic_bias: f64,

    /// Weight of the pessimistic bound in selection
    #[arg(long, default_value_t = default_pessimistic_bias())]
    pub pessimistic_bias: f64,

    /// Attempts at a constrained deal before relaxing constraints
    #[arg(long, default_value_t = default_determinization_attempts())]
    pub determinization_attempts: u32,

    /// Rollout policy (random, or heuristic for jass)
    #[arg(long, default_value_t = default_playout())]
    pub playout: String,

    /// Strength preset (fast_test ... ironman); overrides budgets and determinizations
    #[arg(long)]
    pub strength: Option<String>,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            bail!("games must be greater than 0");
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            bail!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            );
        }

        let game = self.game_kind()?;
        self.opponent_kind()?;
        if game == GameKind::TicTacToe && self.playout_kind()? == PlayoutKind::Heuristic {
            bail!("tictactoe has no heuristic playout, use --playout random");
        }

        self.search_config()?.validate()?;
        Ok(())
    }

    pub fn game_kind(&self) -> Result<GameKind> {
        self.game.parse()
    }

    pub fn opponent_kind(&self) -> Result<Opponent> {
        self.opponent.parse()
    }

    pub fn playout_kind(&self) -> Result<PlayoutKind> {
        self.playout.parse()
    }

    /// Strength preset from the command line, falling back to config.toml.
    pub fn strength_level(&self) -> Result<Option<StrengthLevel>> {
        let name = self
            .strength
            .clone()
            .or_else(|| CENTRAL_CONFIG.search.strength.clone());
        match name {
            Some(name) => Ok(Some(name.parse()?)),
            None => Ok(None),
        }
    }

    /// Search configuration of the challenger.
    ///
    /// With a strength preset the budgets come from the preset and the
    /// determinization count is rescaled per decision by the player.
    pub fn search_config(&self) -> Result<SearchConfig> {
        let mut config = match self.strength_level()? {
            Some(level) => SearchConfig::for_strength(level, 1),
            None => {
                let mut config = SearchConfig {
                    iterations: (self.iterations > 0).then_some(self.iterations),
                    time_budget: (self.time_budget_ms > 0)
                        .then(|| Duration::from_millis(self.time_budget_ms)),
                    ..SearchConfig::default()
                };
                if self.determinizations > 0 {
                    config = config.with_determinizations(self.determinizations);
                }
                config
            }
        };

        config = config
            .with_threads(self.threads)
            .with_exploration(self.exploration)
            .with_final_selection(self.final_selection.parse::<FinalSelectionPolicy>()?)
            .with_parallelism(self.parallelism.parse::<Parallelism>()?)
            .with_pruning(self.pruning)
            .with_playouts(self.playouts)
            .with_biases(self.optimistic_bias, self.pessimistic_bias)
            .with_seed(self.seed);
        config.determinization_attempts = self.determinization_attempts;
        Ok(config)
    }
}
