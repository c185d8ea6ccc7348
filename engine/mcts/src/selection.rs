//! UCB1 child selection.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha20Rng;

/// What selection needs to know about one child, seen from the parent's
/// player.
#[derive(Debug, Clone, Copy)]
pub struct ChildView {
    pub games: u64,
    /// Score sum of the parent's player
    pub score: f64,
    /// Optimistic bound of the parent's player
    pub optimistic: f64,
    /// Pessimistic bound of the parent's player
    pub pessimistic: f64,
    pub pruned: bool,
}

/// Selection constants.
#[derive(Debug, Clone, Copy)]
pub struct SelectionParams {
    pub exploration: f64,
    pub optimistic_bias: f64,
    pub pessimistic_bias: f64,
}

/// UCB1 value of a child.
///
/// `score / games + C * sqrt(ln(parent_games + 1) / games)`. An unvisited
/// child is infinitely attractive.
#[inline]
pub fn ucb1(score: f64, games: u64, parent_games: u64, exploration: f64) -> f64 {
    if games == 0 {
        return f64::INFINITY;
    }
    let games = games as f64;
    score / games + exploration * (((parent_games + 1) as f64).ln() / games).sqrt()
}

/// Index of the child to descend into.
///
/// Pruned children are skipped. When every child is pruned the one with the
/// best pessimistic bound is returned instead. Ties go to the child that was
/// discovered first. `None` only when there are no children.
pub fn select_child(
    parent_games: u64,
    children: &[ChildView],
    params: &SelectionParams,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, child) in children.iter().enumerate() {
        if child.pruned {
            continue;
        }
        let value = ucb1(child.score, child.games, parent_games, params.exploration)
            + params.optimistic_bias * child.optimistic
            + params.pessimistic_bias * child.pessimistic;
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((i, value));
        }
    }

    best.map(|(i, _)| i).or_else(|| best_pessimistic(children))
}

/// Child with the highest pessimistic bound, first discovered on ties.
pub fn best_pessimistic(children: &[ChildView]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, child) in children.iter().enumerate() {
        if best.map_or(true, |(_, b)| child.pessimistic > b) {
            best = Some((i, child.pessimistic));
        }
    }
    best.map(|(i, _)| i)
}

/// Index drawn proportionally to `weights`.
///
/// Non-positive and non-finite weights are treated as zero; if nothing has
/// positive weight the draw is uniform.
pub fn weighted_index(weights: &[f64], rng: &mut ChaCha20Rng) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let clean = weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
    match WeightedIndex::new(clean) {
        Ok(dist) => Some(dist.sample(rng)),
        Err(_) => Some(rng.gen_range(0..weights.len())),
    }
}
