//! Configuration struct definitions.
//!
//! Enum-valued settings (`final_selection`, `parallelism`, `strength`,
//! `playout`) stay strings here and are parsed by the consumer, so the
//! config file and command-line flags share one spelling.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required by #[serde(default = "...")])
// ============================================================================

fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_seed() -> u64 {
    defaults::seed()
}
fn d_exploration() -> f64 {
    defaults::exploration()
}
fn d_threads() -> usize {
    defaults::threads()
}
fn d_determinizations() -> usize {
    defaults::determinizations()
}
fn d_iterations() -> u64 {
    defaults::iterations()
}
fn d_time_budget_ms() -> u64 {
    defaults::time_budget_ms()
}
fn d_final_selection() -> String {
    defaults::final_selection().into()
}
fn d_parallelism() -> String {
    defaults::parallelism().into()
}
fn d_pruning() -> bool {
    defaults::pruning()
}
fn d_playouts() -> u32 {
    defaults::playouts()
}
fn d_optimistic_bias() -> f64 {
    defaults::optimistic_bias()
}
fn d_pessimistic_bias() -> f64 {
    defaults::pessimistic_bias()
}
fn d_determinization_attempts() -> u32 {
    defaults::determinization_attempts()
}
fn d_playout() -> String {
    defaults::playout().into()
}
fn d_arena_game() -> String {
    defaults::arena_game().into()
}
fn d_arena_games() -> u32 {
    defaults::arena_games()
}
fn d_arena_opponent() -> String {
    defaults::arena_opponent().into()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub arena: ArenaSettings,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
    /// Base seed; each decision derives its own stream from it
    #[serde(default = "d_seed")]
    pub seed: u64,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level().into(),
            seed: defaults::seed(),
        }
    }
}

/// Search settings, one-to-one with the engine's search configuration.
///
/// Zero means "unset" for `determinizations` (one per thread) and
/// `time_budget_ms` (no time limit). When `strength` names a preset it
/// replaces the thread, determinization and budget fields.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchSettings {
    #[serde(default = "d_exploration")]
    pub exploration: f64,
    #[serde(default = "d_threads")]
    pub threads: usize,
    #[serde(default = "d_determinizations")]
    pub determinizations: usize,
    #[serde(default = "d_iterations")]
    pub iterations: u64,
    #[serde(default = "d_time_budget_ms")]
    pub time_budget_ms: u64,
    #[serde(default = "d_final_selection")]
    pub final_selection: String,
    #[serde(default = "d_parallelism")]
    pub parallelism: String,
    #[serde(default = "d_pruning")]
    pub pruning: bool,
    #[serde(default = "d_playouts")]
    pub playouts: u32,
    #[serde(default = "d_optimistic_bias")]
    pub optimistic_bias: f64,
    #[serde(default = "d_pessimistic_bias")]
    pub pessimistic_bias: f64,
    #[serde(default = "d_determinization_attempts")]
    pub determinization_attempts: u32,
    #[serde(default = "d_playout")]
    pub playout: String,
    #[serde(default)]
    pub strength: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            exploration: defaults::exploration(),
            threads: defaults::threads(),
            determinizations: defaults::determinizations(),
            iterations: defaults::iterations(),
            time_budget_ms: defaults::time_budget_ms(),
            final_selection: defaults::final_selection().into(),
            parallelism: defaults::parallelism().into(),
            pruning: defaults::pruning(),
            playouts: defaults::playouts(),
            optimistic_bias: defaults::optimistic_bias(),
            pessimistic_bias: defaults::pessimistic_bias(),
            determinization_attempts: defaults::determinization_attempts(),
            playout: defaults::playout().into(),
            strength: None,
        }
    }
}

/// Arena match settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ArenaSettings {
    #[serde(default = "d_arena_game")]
    pub game: String,
    #[serde(default = "d_arena_games")]
    pub games: u32,
    #[serde(default = "d_arena_opponent")]
    pub opponent: String,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            game: defaults::arena_game().into(),
            games: defaults::arena_games(),
            opponent: defaults::arena_opponent().into(),
        }
    }
}
