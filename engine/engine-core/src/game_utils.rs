//! Shared utilities for building and checking score vectors
//!
//! Game implementations use these to produce [`Scores`] in the normalised
//! `[MIN_SCORE, MAX_SCORE]` range; the search uses [`validate_scores`] on
//! anything that comes from outside its own rollouts.

use crate::{EvaluatorError, PlayerId, Scores, MAX_SCORE, MIN_SCORE};

/// Score vector in which `winner` gets the maximum and everybody else the
/// minimum.
///
/// # Example
/// ```
/// use engine_core::game_utils::win_for;
///
/// assert_eq!(win_for(1, 2), vec![0.0, 1.0]);
/// assert_eq!(win_for(0, 3), vec![1.0, 0.0, 0.0]);
/// ```
#[inline]
pub fn win_for(winner: PlayerId, player_count: usize) -> Scores {
    let mut scores = vec![MIN_SCORE; player_count];
    scores[winner] = MAX_SCORE;
    scores
}

/// Score vector of a draw: everybody gets the midpoint.
///
/// # Example
/// ```
/// use engine_core::game_utils::draw;
///
/// assert_eq!(draw(2), vec![0.5, 0.5]);
/// ```
#[inline]
pub fn draw(player_count: usize) -> Scores {
    vec![(MIN_SCORE + MAX_SCORE) / 2.0; player_count]
}

/// Normalise raw team points into a per-player score vector.
///
/// `team_of[p]` is the team of player `p`, `team_points[t]` the points that
/// team made and `total` the number of points available in a game.
///
/// # Example
/// ```
/// use engine_core::game_utils::team_scores;
///
/// // Two teams of two, seated alternately.
/// let scores = team_scores(&[100.0, 57.0], &[0, 1, 0, 1], 157.0);
/// assert!((scores[0] - 100.0 / 157.0).abs() < 1e-12);
/// assert_eq!(scores[0], scores[2]);
/// assert_eq!(scores[1], scores[3]);
/// ```
pub fn team_scores(team_points: &[f64], team_of: &[usize], total: f64) -> Scores {
    team_of
        .iter()
        .map(|&team| (team_points[team] / total).clamp(MIN_SCORE, MAX_SCORE))
        .collect()
}

/// Check that `scores` is a usable score vector for `player_count` players.
///
/// Fails when the length is wrong or any entry is non-finite or outside
/// `[MIN_SCORE, MAX_SCORE]`.
pub fn validate_scores(scores: &[f64], player_count: usize) -> Result<(), EvaluatorError> {
    if scores.len() != player_count {
        return Err(EvaluatorError::WrongLength {
            expected: player_count,
            actual: scores.len(),
        });
    }
    for (player, &value) in scores.iter().enumerate() {
        if !value.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&value) {
            return Err(EvaluatorError::OutOfRange { player, value });
        }
    }
    Ok(())
}

/// Add `scores` into the running sum `acc`, element-wise.
#[inline]
pub fn accumulate(acc: &mut [f64], scores: &[f64]) {
    for (total, value) in acc.iter_mut().zip(scores) {
        *total += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_and_draw() {
        assert_eq!(win_for(0, 2), vec![1.0, 0.0]);
        assert_eq!(win_for(3, 4), vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(draw(4), vec![0.5; 4]);
    }

    #[test]
    fn test_team_scores_clamps() {
        let scores = team_scores(&[200.0, -5.0], &[0, 1], 157.0);
        assert_eq!(scores, vec![1.0, 0.0]);
    }

    #[test]
    fn test_validate_scores() {
        assert!(validate_scores(&[0.25, 0.75], 2).is_ok());
        assert!(validate_scores(&[0.0, 1.0], 2).is_ok());

        assert!(matches!(
            validate_scores(&[0.5], 2),
            Err(EvaluatorError::WrongLength {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            validate_scores(&[0.5, 1.5], 2),
            Err(EvaluatorError::OutOfRange { player: 1, .. })
        ));
        assert!(matches!(
            validate_scores(&[f64::NAN, 0.5], 2),
            Err(EvaluatorError::OutOfRange { player: 0, .. })
        ));
    }

    #[test]
    fn test_accumulate() {
        let mut acc = vec![0.0; 2];
        accumulate(&mut acc, &[1.0, 0.0]);
        accumulate(&mut acc, &[0.5, 0.5]);
        assert_eq!(acc, vec![1.5, 0.5]);
    }
}
