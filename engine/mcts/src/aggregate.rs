//! Root statistics, their aggregation across trees, and final move selection.

use serde::Serialize;

use crate::config::FinalSelectionPolicy;

/// Statistics of one root move, from the perspective of the player to move
/// at the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveStats<M> {
    pub mv: M,
    /// Simulations through this move
    pub visits: u64,
    /// Sum of the root player's scores over those simulations
    pub score: f64,
    pub optimistic: f64,
    pub pessimistic: f64,
}

impl<M> MoveStats<M> {
    /// Average score of the root player, 0.0 when never visited.
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.score / self.visits as f64
        }
    }
}

/// Combine per-tree root statistics into one table.
///
/// Visits and scores are summed; the optimistic bound is the largest seen and
/// the pessimistic bound the smallest, so a bound only counts as secure when it
/// holds in every sample. Moves keep the order in which they were first seen.
pub fn merge<M, I>(tables: I) -> Vec<MoveStats<M>>
where
    M: PartialEq,
    I: IntoIterator<Item = Vec<MoveStats<M>>>,
{
    let mut merged: Vec<MoveStats<M>> = Vec::new();
    for table in tables {
        for stats in table {
            match merged.iter_mut().find(|m| m.mv == stats.mv) {
                Some(entry) => {
                    entry.visits += stats.visits;
                    entry.score += stats.score;
                    entry.optimistic = entry.optimistic.max(stats.optimistic);
                    entry.pessimistic = entry.pessimistic.min(stats.pessimistic);
                }
                None => merged.push(stats),
            }
        }
    }
    merged
}

/// Index of the move to play according to `policy`.
///
/// Ties go to the entry that comes first. `None` only for an empty table.
pub fn select_final<M>(
    table: &[MoveStats<M>],
    policy: FinalSelectionPolicy,
    optimistic_bias: f64,
    pessimistic_bias: f64,
) -> Option<usize> {
    match policy {
        FinalSelectionPolicy::RobustChild => argmax(table, |s| (s.visits as f64, 0.0)),
        FinalSelectionPolicy::MaxChild => argmax(table, |s| {
            (
                s.mean() + optimistic_bias * s.optimistic + pessimistic_bias * s.pessimistic,
                0.0,
            )
        }),
        FinalSelectionPolicy::BoundSecureChild => {
            argmax(table, |s| (s.pessimistic, s.visits as f64))
        }
    }
}

/// First index with the lexicographically largest key.
fn argmax<M>(table: &[MoveStats<M>], key: impl Fn(&MoveStats<M>) -> (f64, f64)) -> Option<usize> {
    let mut best: Option<(usize, (f64, f64))> = None;
    for (i, stats) in table.iter().enumerate() {
        let k = key(stats);
        let better = match best {
            None => true,
            Some((_, b)) => k.0 > b.0 || (k.0 == b.0 && k.1 > b.1),
        };
        if better {
            best = Some((i, k));
        }
    }
    best.map(|(i, _)| i)
}
