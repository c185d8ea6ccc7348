//! Score-bounds propagation and pruning rules.
//!
//! Bounds start at the full score range and are seeded with the exact score
//! of proven terminal states. A parent's bounds are recomputed from its
//! children: the player to move picks the best child, so their bounds are the
//! maximum over children; every other player gets the minimum, since they do
//! not control the choice. Moves that have not been tried yet could be
//! anything, which keeps the mover's optimistic bound at the maximum and the
//! others' pessimistic bounds at the minimum.

use engine_core::{PlayerId, MAX_SCORE, MIN_SCORE};

use crate::node::Bounds;

/// Recompute a node's bounds from its children.
///
/// Returns `None` when there are no children, in which case the node keeps
/// whatever bounds it had. Chance nodes take the widest interval over their
/// children for every player: nobody chooses the outcome.
pub fn combine<'a, I>(
    player: PlayerId,
    player_count: usize,
    chance: bool,
    has_unvisited: bool,
    children: I,
) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a Bounds>,
{
    let mut optimistic = vec![0.0; player_count];
    let mut pessimistic = vec![0.0; player_count];
    for p in 0..player_count {
        if chance || p != player {
            optimistic[p] = if chance { MIN_SCORE } else { MAX_SCORE };
            pessimistic[p] = MAX_SCORE;
        } else {
            optimistic[p] = MIN_SCORE;
            pessimistic[p] = MIN_SCORE;
        }
    }

    let mut any = false;
    for child in children {
        any = true;
        for p in 0..player_count {
            if chance {
                optimistic[p] = optimistic[p].max(child.optimistic[p]);
                pessimistic[p] = pessimistic[p].min(child.pessimistic[p]);
            } else if p == player {
                optimistic[p] = optimistic[p].max(child.optimistic[p]);
                pessimistic[p] = pessimistic[p].max(child.pessimistic[p]);
            } else {
                optimistic[p] = optimistic[p].min(child.optimistic[p]);
                pessimistic[p] = pessimistic[p].min(child.pessimistic[p]);
            }
        }
    }
    if !any {
        return None;
    }

    if has_unvisited && !chance {
        for p in 0..player_count {
            if p == player {
                optimistic[p] = MAX_SCORE;
            } else {
                pessimistic[p] = MIN_SCORE;
            }
        }
    }

    Some(Bounds {
        optimistic,
        pessimistic,
    })
}

/// `child` can never do better for `player` than what the parent already
/// guarantees them.
#[inline]
pub fn should_prune(player: PlayerId, parent: &Bounds, child: &Bounds) -> bool {
    parent.pessimistic[player] >= child.optimistic[player]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(optimistic: &[f64], pessimistic: &[f64]) -> Bounds {
        Bounds {
            optimistic: optimistic.to_vec(),
            pessimistic: pessimistic.to_vec(),
        }
    }

    #[test]
    fn test_no_children_keeps_bounds() {
        assert!(combine(0, 2, false, true, std::iter::empty()).is_none());
    }

    #[test]
    fn test_max_for_mover_min_for_others() {
        let children = [
            Bounds::exact(&[1.0, 0.0]),
            Bounds::exact(&[0.5, 0.5]),
        ];
        let combined = combine(0, 2, false, false, &children).unwrap();
        assert_eq!(combined, Bounds::exact(&[1.0, 0.0]));

        let combined = combine(1, 2, false, false, &children).unwrap();
        assert_eq!(combined.optimistic, vec![0.5, 0.5]);
        assert_eq!(combined.pessimistic, vec![0.5, 0.5]);
    }

    #[test]
    fn test_unvisited_moves_widen_bounds() {
        let children = [Bounds::exact(&[0.0, 1.0])];
        let combined = combine(0, 2, false, true, &children).unwrap();
        assert_eq!(combined.optimistic, vec![1.0, 1.0]);
        assert_eq!(combined.pessimistic, vec![0.0, 0.0]);
        assert!(combined.is_consistent());
    }

    #[test]
    fn test_unknown_children_stay_unknown() {
        let children = [Bounds::unknown(2), Bounds::exact(&[0.0, 1.0])];
        let combined = combine(0, 2, false, false, &children).unwrap();
        assert_eq!(combined.optimistic, vec![1.0, 1.0]);
        assert_eq!(combined.pessimistic, vec![0.0, 0.0]);
    }

    #[test]
    fn test_chance_takes_widest_interval() {
        let children = [
            Bounds::exact(&[1.0, 0.0]),
            Bounds::exact(&[0.0, 1.0]),
        ];
        let combined = combine(0, 2, true, false, &children).unwrap();
        assert_eq!(combined.optimistic, vec![1.0, 1.0]);
        assert_eq!(combined.pessimistic, vec![0.0, 0.0]);
    }

    #[test]
    fn test_partial_knowledge() {
        let children = [
            bounds(&[0.8, 0.6], &[0.4, 0.2]),
            bounds(&[0.6, 0.9], &[0.5, 0.1]),
        ];
        let combined = combine(0, 2, false, false, &children).unwrap();
        assert_eq!(combined.optimistic, vec![0.8, 0.6]);
        assert_eq!(combined.pessimistic, vec![0.5, 0.1]);
        assert!(combined.is_consistent());
    }

    #[test]
    fn test_should_prune() {
        let parent = bounds(&[1.0, 1.0], &[0.5, 0.0]);
        assert!(should_prune(0, &parent, &Bounds::exact(&[0.5, 0.5])));
        assert!(should_prune(0, &parent, &Bounds::exact(&[0.0, 1.0])));
        assert!(!should_prune(0, &parent, &Bounds::unknown(2)));
        assert!(!should_prune(0, &parent, &bounds(&[0.6, 0.4], &[0.0, 0.0])));
    }
}
