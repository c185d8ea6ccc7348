//! Centralized configuration loading from config.toml.
//!
//! This crate provides configuration structs and loading logic shared by
//! every Kibitz binary.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`KIBITZ_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! KIBITZ_<SECTION>_<KEY>=value
//!
//! Examples:
//!     KIBITZ_COMMON_LOG_LEVEL=debug
//!     KIBITZ_SEARCH_THREADS=8
//!     KIBITZ_SEARCH_PRUNING=false
//!     KIBITZ_SEARCH_STRENGTH=strong
//!     KIBITZ_ARENA_GAME=jass
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, CONFIG_ENV_VAR, CONFIG_SEARCH_PATHS,
};
pub use structs::*;

#[cfg(test)]
mod tests;
