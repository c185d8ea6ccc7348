//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so every binary agrees on
//! the same values without shipping the file alongside it.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    search: SearchDefaults,
    arena: ArenaDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    log_level: String,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct SearchDefaults {
    exploration: f64,
    threads: usize,
    determinizations: usize,
    iterations: u64,
    time_budget_ms: u64,
    final_selection: String,
    parallelism: String,
    pruning: bool,
    playouts: u32,
    optimistic_bias: f64,
    pessimistic_bias: f64,
    determinization_attempts: u32,
    playout: String,
}

#[derive(Debug, Deserialize)]
struct ArenaDefaults {
    game: String,
    games: u32,
    opponent: String,
}

// ============================================================================
// Public accessor functions for defaults
// ============================================================================

// Common
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}
pub fn seed() -> u64 {
    DEFAULTS.common.seed
}

// Search
pub fn exploration() -> f64 {
    DEFAULTS.search.exploration
}
pub fn threads() -> usize {
    DEFAULTS.search.threads
}
pub fn determinizations() -> usize {
    DEFAULTS.search.determinizations
}
pub fn iterations() -> u64 {
    DEFAULTS.search.iterations
}
pub fn time_budget_ms() -> u64 {
    DEFAULTS.search.time_budget_ms
}
pub fn final_selection() -> &'static str {
    &DEFAULTS.search.final_selection
}
pub fn parallelism() -> &'static str {
    &DEFAULTS.search.parallelism
}
pub fn pruning() -> bool {
    DEFAULTS.search.pruning
}
pub fn playouts() -> u32 {
    DEFAULTS.search.playouts
}
pub fn optimistic_bias() -> f64 {
    DEFAULTS.search.optimistic_bias
}
pub fn pessimistic_bias() -> f64 {
    DEFAULTS.search.pessimistic_bias
}
pub fn determinization_attempts() -> u32 {
    DEFAULTS.search.determinization_attempts
}
pub fn playout() -> &'static str {
    &DEFAULTS.search.playout
}

// Arena
pub fn arena_game() -> &'static str {
    &DEFAULTS.arena.game
}
pub fn arena_games() -> u32 {
    DEFAULTS.arena.games
}
pub fn arena_opponent() -> &'static str {
    &DEFAULTS.arena.opponent
}
