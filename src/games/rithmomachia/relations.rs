//! Capture arithmetic.
//!
//! `m` is the attacker's value, `t` the target's, `h` the helper's.
//! Everything is widened to u64 so products cannot overflow.

use super::types::CaptureRelation;

/// Whether `relation` holds. Helper relations return false without a
/// helper, and helper-free relations return false when one is supplied.
pub fn relation_holds(relation: CaptureRelation, m: u32, t: u32, h: Option<u32>) -> bool {
    let (m, t) = (m as u64, t as u64);
    match (relation, h.map(u64::from)) {
        (CaptureRelation::Equal, None) => m == t,
        (CaptureRelation::Multiple, None) => t != 0 && m % t == 0 && m / t >= 2,
        (CaptureRelation::Divisor, None) => m != 0 && t % m == 0 && t / m >= 2,
        (CaptureRelation::Sum, Some(h)) => m + h == t,
        (CaptureRelation::Diff, Some(h)) => m.abs_diff(h) == t,
        (CaptureRelation::Product, Some(h)) => m * h == t,
        (CaptureRelation::Ratio, Some(h)) => m == t * h || h == t * m,
        _ => false,
    }
}

/// Helper-free relations satisfied by `m` against `t`.
pub fn direct_relations(m: u32, t: u32) -> Vec<CaptureRelation> {
    CaptureRelation::ALL
        .into_iter()
        .filter(|r| !r.needs_helper() && relation_holds(*r, m, t, None))
        .collect()
}

/// Helper relations satisfied by `m` and `h` against `t`.
pub fn assisted_relations(m: u32, t: u32, h: u32) -> Vec<CaptureRelation> {
    CaptureRelation::ALL
        .into_iter()
        .filter(|r| r.needs_helper() && relation_holds(*r, m, t, Some(h)))
        .collect()
}
