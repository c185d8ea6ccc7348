//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "KIBITZ_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from a crate directory)
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the KIBITZ_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = Path::new(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_ENV_VAR, path.display());
            return load_from_path(path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// A file that cannot be read or parsed is logged and replaced by the
/// built-in defaults; environment overrides apply either way.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, u64, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = v;
        }
    };
    // Optional string field
    ($config:expr, $section:ident . $field:ident, $key:expr, optional) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = Some(v);
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: KIBITZ_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.log_level, "KIBITZ_COMMON_LOG_LEVEL");
    env_override!(config, common.seed, "KIBITZ_COMMON_SEED", parse);

    // Search
    env_override!(config, search.exploration, "KIBITZ_SEARCH_EXPLORATION", parse);
    env_override!(config, search.threads, "KIBITZ_SEARCH_THREADS", parse);
    env_override!(
        config,
        search.determinizations,
        "KIBITZ_SEARCH_DETERMINIZATIONS",
        parse
    );
    env_override!(config, search.iterations, "KIBITZ_SEARCH_ITERATIONS", parse);
    env_override!(
        config,
        search.time_budget_ms,
        "KIBITZ_SEARCH_TIME_BUDGET_MS",
        parse
    );
    env_override!(
        config,
        search.final_selection,
        "KIBITZ_SEARCH_FINAL_SELECTION"
    );
    env_override!(config, search.parallelism, "KIBITZ_SEARCH_PARALLELISM");
    env_override!(config, search.pruning, "KIBITZ_SEARCH_PRUNING", parse);
    env_override!(config, search.playouts, "KIBITZ_SEARCH_PLAYOUTS", parse);
    env_override!(
        config,
        search.optimistic_bias,
        "KIBITZ_SEARCH_OPTIMISTIC_BIAS",
        parse
    );
    env_override!(
        config,
        search.pessimistic_bias,
        "KIBITZ_SEARCH_PESSIMISTIC_BIAS",
        parse
    );
    env_override!(
        config,
        search.determinization_attempts,
        "KIBITZ_SEARCH_DETERMINIZATION_ATTEMPTS",
        parse
    );
    env_override!(config, search.playout, "KIBITZ_SEARCH_PLAYOUT");
    env_override!(config, search.strength, "KIBITZ_SEARCH_STRENGTH", optional);

    // Arena
    env_override!(config, arena.game, "KIBITZ_ARENA_GAME");
    env_override!(config, arena.games, "KIBITZ_ARENA_GAMES", parse);
    env_override!(config, arena.opponent, "KIBITZ_ARENA_OPPONENT");

    config
}
