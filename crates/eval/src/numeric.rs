//! Decimal arithmetic for scores, tolerances and confidences.
//!
//! Every published figure is rounded with
//! `RoundingStrategy::MidpointNearestEven`. Comparisons against
//! thresholds always use the unrounded value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::types::CompareOp;

/// `matched / total`, or zero when there is nothing to match.
pub fn fraction(matched: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(matched as u64) / Decimal::from(total as u64)
}

/// Round to `dp` decimal places for display.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Score as published on candidates and verification results.
pub fn published_score(raw: Decimal) -> Decimal {
    round_dp(raw, 2)
}

/// Whole-number percentage of a fraction, e.g. 0.666.. -> 67.
pub fn percent(fraction: Decimal) -> Decimal {
    round_dp(fraction * Decimal::ONE_HUNDRED, 0)
}

pub fn clamp(value: Decimal, min: Decimal, max: Decimal) -> Decimal {
    value.max(min).min(max)
}

/// Inclusive tolerance band: `t*(1-p) <= v <= t*(1+p)`.
pub fn within_tolerance(value: Decimal, target: Decimal, tolerance: Decimal) -> bool {
    let low = target * (Decimal::ONE - tolerance);
    let high = target * (Decimal::ONE + tolerance);
    low <= value && value <= high
}

pub fn compare(left: Decimal, op: CompareOp, right: Decimal) -> bool {
    match op {
        CompareOp::Gt => left > right,
        CompareOp::Gte => left >= right,
        CompareOp::Lt => left < right,
        CompareOp::Lte => left <= right,
        CompareOp::Eq => left == right,
        CompareOp::Neq => left != right,
    }
}

/// JSON number for a decimal, falling back to its string form when it
/// has no `f64` representation.
pub fn decimal_to_json(value: Decimal) -> serde_json::Value {
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn fraction_of_zero_total_is_zero() {
        assert_eq!(fraction(0, 0), Decimal::ZERO);
        assert_eq!(fraction(3, 0), Decimal::ZERO);
    }

    #[test]
    fn two_thirds_publishes_as_067() {
        let raw = fraction(2, 3);
        assert!(raw >= d("0.66"));
        assert!(raw < d("0.67"));
        assert_eq!(published_score(raw), d("0.67"));
        assert_eq!(percent(raw), d("67"));
    }

    #[test]
    fn tolerance_bounds_are_inclusive() {
        // 0.26 +/- 12% = [0.2288, 0.2912]
        assert!(within_tolerance(d("0.2288"), d("0.26"), d("0.12")));
        assert!(within_tolerance(d("0.2912"), d("0.26"), d("0.12")));
        assert!(!within_tolerance(d("0.2287"), d("0.26"), d("0.12")));
        assert!(!within_tolerance(d("0.2913"), d("0.26"), d("0.12")));
    }

    #[test]
    fn clamp_limits_both_sides() {
        assert_eq!(clamp(d("150"), Decimal::ZERO, Decimal::ONE_HUNDRED), d("100"));
        assert_eq!(clamp(d("-5"), Decimal::ZERO, Decimal::ONE_HUNDRED), d("0"));
        assert_eq!(clamp(d("42.5"), Decimal::ZERO, Decimal::ONE_HUNDRED), d("42.5"));
    }

    #[test]
    fn compare_ops() {
        assert!(compare(d("0.35"), CompareOp::Gt, d("0.30")));
        assert!(!compare(d("0.30"), CompareOp::Gt, d("0.30")));
        assert!(compare(d("0.30"), CompareOp::Gte, d("0.30")));
        assert!(compare(d("1"), CompareOp::Neq, d("2")));
    }
}
