//! Playout policies for the simulation phase.
//!
//! A playout policy turns a board reached by the tree policy into a score
//! vector, either by playing the game out or by estimating the result
//! directly. The search picks one policy per configuration and falls back to
//! a uniform random rollout whenever the policy fails.

use engine_core::game_utils::{accumulate, validate_scores};
use engine_core::{Board, CallSite, EvaluatorError, MoveHeuristic, ScoreEstimator, Scores};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::selection::weighted_index;

/// Trait for playout policies.
///
/// Implementations could be:
/// - RandomRollout: Uniform (or chance-weighted) moves to the end of the game
/// - HeuristicPlayout: Domain knowledge picks each rollout move
/// - ExactSolver: Exhaustive search of small endgames
/// - EstimatorPlayout: A learned or hand-written score estimator
pub trait PlayoutPolicy<B: Board>: Send + Sync {
    /// Score vector for `board`.
    fn playout(&self, board: &B, rng: &mut ChaCha20Rng) -> Result<Scores, EvaluatorError>;
}

impl<B: Board> PlayoutPolicy<B> for Box<dyn PlayoutPolicy<B>> {
    fn playout(&self, board: &B, rng: &mut ChaCha20Rng) -> Result<Scores, EvaluatorError> {
        self.as_ref().playout(board, rng)
    }
}

/// Uniform random rollout. Chance states are sampled by their weights.
///
/// Boards that carry their own estimator are estimated instead of rolled out
/// (see [`Board::has_external_evaluator`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRollout;

impl RandomRollout {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Board> PlayoutPolicy<B> for RandomRollout {
    fn playout(&self, board: &B, rng: &mut ChaCha20Rng) -> Result<Scores, EvaluatorError> {
        Ok(random_rollout(board, rng))
    }
}

/// Play uniformly random legal moves until the game ends.
pub fn random_rollout<B: Board>(board: &B, rng: &mut ChaCha20Rng) -> Scores {
    let mut board = board.clone();
    while !board.is_terminal() {
        let moves = board.legal_moves(CallSite::Playout);
        if moves.is_empty() {
            break;
        }
        let idx = chance_index(&board, moves.len(), rng)
            .unwrap_or_else(|| rng.gen_range(0..moves.len()));
        board.apply(&moves[idx]);
    }
    board.scores()
}

/// Weighted draw when `board` is a chance state with usable weights.
fn chance_index<B: Board>(board: &B, n_moves: usize, rng: &mut ChaCha20Rng) -> Option<usize> {
    let weights = board.chance_weights()?;
    if weights.len() != n_moves {
        return None;
    }
    weighted_index(&weights, rng)
}

/// Rollout in which a [`MoveHeuristic`] picks the moves.
///
/// Steps where the heuristic has no opinion are played uniformly at random.
#[derive(Debug, Clone, Default)]
pub struct HeuristicPlayout<H> {
    heuristic: H,
}

impl<H> HeuristicPlayout<H> {
    pub fn new(heuristic: H) -> Self {
        Self { heuristic }
    }
}

impl<B: Board, H: MoveHeuristic<B>> PlayoutPolicy<B> for HeuristicPlayout<H> {
    fn playout(&self, board: &B, rng: &mut ChaCha20Rng) -> Result<Scores, EvaluatorError> {
        let mut board = board.clone();
        while !board.is_terminal() {
            let moves = board.legal_moves(CallSite::Playout);
            if moves.is_empty() {
                break;
            }
            let mv = match chance_index(&board, moves.len(), rng) {
                Some(idx) => moves[idx].clone(),
                None => match self.heuristic.choose(&board, &moves) {
                    Some(mv) if moves.contains(&mv) => mv,
                    Some(mv) => {
                        return Err(EvaluatorError::Failed(format!(
                            "heuristic chose illegal move {mv:?}"
                        )))
                    }
                    None => moves[rng.gen_range(0..moves.len())].clone(),
                },
            };
            board.apply(&mv);
        }
        Ok(board.scores())
    }
}

/// Delegates to an injected [`ScoreEstimator`].
#[derive(Debug, Clone, Default)]
pub struct EstimatorPlayout<E> {
    estimator: E,
}

impl<E> EstimatorPlayout<E> {
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<B: Board, E: ScoreEstimator<B>> PlayoutPolicy<B> for EstimatorPlayout<E> {
    fn playout(&self, board: &B, _rng: &mut ChaCha20Rng) -> Result<Scores, EvaluatorError> {
        if board.is_terminal() {
            return Ok(board.scores());
        }
        self.estimator.estimate(board)
    }
}

/// Exhaustive max^n search: every player maximises their own score and chance
/// states are averaged by weight.
///
/// Only practical near the end of a game; gives up with an error once more
/// than `node_budget` states have been visited.
#[derive(Debug, Clone, Copy)]
pub struct ExactSolver {
    node_budget: usize,
}

impl ExactSolver {
    pub fn new(node_budget: usize) -> Self {
        Self { node_budget }
    }

    fn solve<B: Board>(&self, board: &B, budget: &mut usize) -> Result<Scores, EvaluatorError> {
        if board.is_terminal() {
            return Ok(board.scores());
        }
        let moves = board.legal_moves(CallSite::TreePolicy);
        if moves.is_empty() {
            return Ok(board.scores());
        }
        if *budget == 0 {
            return Err(EvaluatorError::Failed(format!(
                "exact solve exceeded {} nodes",
                self.node_budget
            )));
        }
        *budget -= 1;

        if let Some(weights) = board.chance_weights().filter(|w| w.len() == moves.len()) {
            let total: f64 = weights.iter().sum();
            let mut expected = vec![0.0; board.player_count()];
            for (mv, w) in moves.iter().zip(&weights) {
                let mut child = board.clone();
                child.apply(mv);
                let scores = self.solve(&child, budget)?;
                for (e, s) in expected.iter_mut().zip(&scores) {
                    *e += s * w / total;
                }
            }
            return Ok(expected);
        }

        let player = board.current_player();
        let mut best: Option<Scores> = None;
        for mv in &moves {
            let mut child = board.clone();
            child.apply(mv);
            let scores = self.solve(&child, budget)?;
            if best.as_ref().map_or(true, |b| scores[player] > b[player]) {
                best = Some(scores);
            }
        }
        Ok(best.unwrap_or_else(|| board.scores()))
    }
}

impl Default for ExactSolver {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl<B: Board> PlayoutPolicy<B> for ExactSolver {
    fn playout(&self, board: &B, _rng: &mut ChaCha20Rng) -> Result<Scores, EvaluatorError> {
        let mut budget = self.node_budget;
        self.solve(board, &mut budget)
    }
}

/// Result of one simulation.
#[derive(Debug, Clone)]
pub(crate) struct Simulated {
    pub scores: Scores,
    /// Playouts that failed and were replaced by a random rollout
    pub fallbacks: u32,
}

/// Run the simulation phase on `board`.
///
/// A board-embedded estimator takes precedence over the configured policy.
/// Otherwise `playouts` runs of the policy are averaged. Any failure, or an
/// estimate that is not a valid score vector, is replaced by a uniform random
/// rollout.
pub(crate) fn simulate<B, P>(
    policy: &P,
    board: &B,
    playouts: u32,
    rng: &mut ChaCha20Rng,
) -> Simulated
where
    B: Board,
    P: PlayoutPolicy<B> + ?Sized,
{
    let player_count = board.player_count();
    let checked = |result: Result<Scores, EvaluatorError>| {
        result.and_then(|scores| validate_scores(&scores, player_count).map(|()| scores))
    };

    if board.has_external_evaluator() {
        return match checked(board.external_estimate()) {
            Ok(scores) => Simulated {
                scores,
                fallbacks: 0,
            },
            Err(e) => {
                debug!(error = %e, "board estimator failed, falling back to random rollout");
                Simulated {
                    scores: random_rollout(board, rng),
                    fallbacks: 1,
                }
            }
        };
    }

    let playouts = playouts.max(1);
    let mut total = vec![0.0; player_count];
    let mut fallbacks = 0;
    for _ in 0..playouts {
        let scores = match checked(policy.playout(board, rng)) {
            Ok(scores) => scores,
            Err(e) => {
                debug!(error = %e, "playout failed, falling back to random rollout");
                fallbacks += 1;
                random_rollout(board, rng)
            }
        };
        accumulate(&mut total, &scores);
    }
    if playouts > 1 {
        for value in &mut total {
            *value /= f64::from(playouts);
        }
    }

    Simulated {
        scores: total,
        fallbacks,
    }
}
