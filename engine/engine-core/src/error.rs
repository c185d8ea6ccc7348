//! Error types shared by boards, knowledge bases and the search engine

use thiserror::Error;

/// Failure of an external score estimator.
///
/// The search never propagates these: the affected simulation falls back to
/// a uniform random rollout and the failure is counted.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("board does not provide an external evaluator")]
    Unavailable,

    #[error("estimate has {actual} entries, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("estimate for player {player} is {value}, outside [0, 1]")]
    OutOfRange { player: usize, value: f64 },

    #[error("evaluation failed: {0}")]
    Failed(String),
}

/// Failure to sample a hidden state consistent with every known constraint.
///
/// Recovered by the determinizer through a relaxed sample; never fatal.
#[derive(Debug, Error)]
pub enum DeterminizationError {
    #[error("no consistent deal found after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("constraints are contradictory: {0}")]
    Infeasible(String),
}
