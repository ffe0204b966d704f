//! Progressions for harmony victories.

use super::types::HarmonyType;

pub const MIN_HARMONY_PIECES: usize = 3;

/// Whether `values`, once sorted, form the given progression.
///
/// Needs at least three distinct values. All tests are exact integer
/// cross-multiplications over consecutive triples.
pub fn is_progression(harmony_type: HarmonyType, values: &[u32]) -> bool {
    if values.len() < MIN_HARMONY_PIECES {
        return false;
    }
    let mut sorted: Vec<u64> = values.iter().map(|&v| v as u64).collect();
    sorted.sort_unstable();
    if sorted[0] == 0 || sorted.windows(2).any(|w| w[0] == w[1]) {
        return false;
    }
    sorted.windows(3).all(|w| {
        let (a, b, c) = (w[0], w[1], w[2]);
        match harmony_type {
            HarmonyType::Arithmetic => b - a == c - b,
            HarmonyType::Geometric => b * b == a * c,
            // reciprocals in arithmetic progression
            HarmonyType::Harmonic => b * (a + c) == 2 * a * c,
        }
    })
}

/// First progression the values satisfy, if any.
pub fn detect_harmony(values: &[u32]) -> Option<HarmonyType> {
    [
        HarmonyType::Arithmetic,
        HarmonyType::Geometric,
        HarmonyType::Harmonic,
    ]
    .into_iter()
    .find(|t| is_progression(*t, values))
}
