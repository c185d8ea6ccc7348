//! Tests for the configuration module.

use super::*;
use std::io::Write;

#[test]
fn test_default_config() {
    let config = CentralConfig::default();
    assert_eq!(config.common.log_level, "info");
    assert_eq!(config.common.seed, 42);
    assert_eq!(config.arena.game, "tictactoe");
    assert_eq!(config.arena.games, 20);
    assert_eq!(config.arena.opponent, "random");
}

#[test]
fn test_search_defaults() {
    let config = CentralConfig::default();
    assert!((config.search.exploration - std::f64::consts::SQRT_2).abs() < 1e-12);
    assert_eq!(config.search.threads, 4);
    assert_eq!(config.search.determinizations, 0);
    assert_eq!(config.search.iterations, 1000);
    assert_eq!(config.search.time_budget_ms, 0);
    assert_eq!(config.search.final_selection, "robust_child");
    assert_eq!(config.search.parallelism, "auto");
    assert!(config.search.pruning);
    assert_eq!(config.search.playouts, 1);
    assert_eq!(config.search.optimistic_bias, 0.0);
    assert_eq!(config.search.pessimistic_bias, 0.0);
    assert_eq!(config.search.determinization_attempts, 32);
    assert_eq!(config.search.playout, "random");
    assert!(config.search.strength.is_none());
}

#[test]
fn test_kibitz_env_overrides() {
    std::env::set_var("KIBITZ_SEARCH_THREADS", "7");
    std::env::set_var("KIBITZ_SEARCH_PRUNING", "false");
    std::env::set_var("KIBITZ_SEARCH_STRENGTH", "strong");

    let config = load_config();
    assert_eq!(config.search.threads, 7);
    assert!(!config.search.pruning);
    assert_eq!(config.search.strength.as_deref(), Some("strong"));

    std::env::remove_var("KIBITZ_SEARCH_THREADS");
    std::env::remove_var("KIBITZ_SEARCH_PRUNING");
    std::env::remove_var("KIBITZ_SEARCH_STRENGTH");
}

#[test]
fn test_unparseable_env_value_is_ignored() {
    std::env::set_var("KIBITZ_ARENA_GAMES", "many");

    let config = apply_env_overrides(CentralConfig::default());
    assert_eq!(config.arena.games, 20);

    std::env::remove_var("KIBITZ_ARENA_GAMES");
}

#[test]
fn test_parse_config_toml() {
    let toml_content = r#"
[common]
log_level = "debug"
seed = 7

[search]
threads = 8
iterations = 5000
final_selection = "max_child"
parallelism = "shared_tree"
optimistic_bias = 0.25
strength = "powerful"

[arena]
game = "jass"
games = 4
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    assert_eq!(config.common.log_level, "debug");
    assert_eq!(config.common.seed, 7);
    assert_eq!(config.search.threads, 8);
    assert_eq!(config.search.iterations, 5000);
    assert_eq!(config.search.final_selection, "max_child");
    assert_eq!(config.search.parallelism, "shared_tree");
    assert!((config.search.optimistic_bias - 0.25).abs() < f64::EPSILON);
    assert_eq!(config.search.strength.as_deref(), Some("powerful"));
    assert_eq!(config.arena.game, "jass");
    assert_eq!(config.arena.games, 4);
}

#[test]
fn test_partial_config() {
    let toml_content = r#"
[search]
pruning = false
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    assert!(!config.search.pruning);
    assert_eq!(config.search.threads, 4); // Default
    assert_eq!(config.common.log_level, "info"); // Default
    assert_eq!(config.arena.opponent, "random"); // Default
}

#[test]
fn test_load_from_path() {
    let path = std::env::temp_dir().join(format!("kibitz-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[arena]\nopponent = \"no-pruning\"").unwrap();

    let config = load_from_path(&path);
    assert_eq!(config.arena.opponent, "no-pruning");
    assert_eq!(config.arena.game, "tictactoe");

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join(format!("kibitz-broken-{}.toml", std::process::id()));
    std::fs::write(&path, "[search\nthreads = ").unwrap();

    let config = load_from_path(&path);
    assert_eq!(config.search.iterations, 1000);

    std::fs::remove_file(&path).unwrap();

    let missing = load_from_path(&path);
    assert_eq!(missing.search.playout, "random");
}

#[test]
fn test_config_clone() {
    let config = CentralConfig::default();
    let cloned = config.clone();
    assert_eq!(config.search.parallelism, cloned.search.parallelism);
    assert_eq!(config.arena.game, cloned.arena.game);
}
