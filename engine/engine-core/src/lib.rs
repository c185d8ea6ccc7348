//! Core traits and types for the Kibitz decision engine
//!
//! This crate provides the contracts the search engine consumes:
//! - `Board`: a fully specified game state with moves, terminal test and scores
//! - `Determinize`: a knowledge base that samples boards consistent with what
//!   an observer knows
//! - `MoveHeuristic` / `ScoreEstimator`: optional domain knowledge for rollouts
//! - `game_utils`: helpers for building normalised score vectors

pub mod board;
pub mod error;
pub mod game_utils;
pub mod knowledge;

// Re-export main types for convenience
pub use board::{
    Board, CallSite, MoveHeuristic, PlayerId, ScoreEstimator, Scores, MAX_SCORE, MIN_SCORE,
};
pub use error::{DeterminizationError, EvaluatorError};
pub use knowledge::{Determinize, PerfectInformation};
