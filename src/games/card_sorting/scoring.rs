//! Scoring for the card sorting challenge.
//!
//! Three signals over the player's sequence vs. the answer key:
//! longest common subsequence (global relative order), exact slot matches,
//! and inversions (local disorder). They are blended with [`ScoringWeights`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::ScoreBreakdown;

/// Blend weights for the three component scores. Product tuning, not derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub relative_order: f64,
    pub exact_position: f64,
    pub inversion: f64,
}

pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    relative_order: 0.5,
    exact_position: 0.3,
    inversion: 0.2,
};

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

/// Length of the longest common subsequence. O(n·m) time and space.
pub fn lcs_length<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[n][m]
}

/// Count pairs `i < j` whose correct positions are out of order.
///
/// User values are first mapped to their index in `correct`; values missing
/// from `correct` are ignored.
pub fn count_inversions(user: &[u32], correct: &[u32]) -> usize {
    let index_of: HashMap<u32, usize> = correct
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, i))
        .collect();
    let positions: Vec<usize> = user
        .iter()
        .filter_map(|v| index_of.get(v).copied())
        .collect();

    let mut inversions = 0;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            if positions[i] > positions[j] {
                inversions += 1;
            }
        }
    }
    inversions
}

pub fn exact_matches<T: PartialEq>(user: &[T], correct: &[T]) -> usize {
    user.iter().zip(correct).filter(|(u, c)| u == c).count()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Score a finished arrangement.
///
/// The blend uses the unrounded component percentages; only the reported
/// component scores and the final score are rounded.
///
/// `start_ms` / `now_ms` are epoch milliseconds; elapsed time is reported in
/// whole seconds and never negative.
pub fn calculate_score(
    user: &[u32],
    correct: &[u32],
    start_ms: i64,
    now_ms: i64,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let n = correct.len();

    let exact = exact_matches(user, correct);
    let lcs = lcs_length(user, correct);
    let inversions = count_inversions(user, correct);

    let max_inversions = n * n.saturating_sub(1) / 2;
    let inversion = if max_inversions == 0 {
        100.0
    } else {
        percent(max_inversions.saturating_sub(inversions), max_inversions)
    };
    let relative_order = percent(lcs, n);
    let exact_position = percent(exact, n);

    let final_score = (relative_order * weights.relative_order
        + exact_position * weights.exact_position
        + inversion * weights.inversion)
        .round()
        .max(0.0) as u32;

    ScoreBreakdown {
        final_score,
        exact_matches: exact,
        lcs_length: lcs,
        inversions,
        relative_order_score: relative_order.round() as u32,
        exact_position_score: exact_position.round() as u32,
        inversion_score: inversion.round() as u32,
        elapsed_time: (now_ms - start_ms).max(0) / 1000,
    }
}
