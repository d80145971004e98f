//! Confidence normalization for dichotomous key rankings.

use rust_decimal::Decimal;

use crate::numeric;

/// Display floors applied when a key path ends at a species leaf.
///
/// A leaf reached after at least one answer shows at least `leaf_floor`;
/// a leaf reached with no answers recorded shows at least
/// `leaf_floor_without_steps`. Both are percentages clamped to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidencePolicy {
    pub leaf_floor: Decimal,
    pub leaf_floor_without_steps: Decimal,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        ConfidencePolicy {
            leaf_floor: Decimal::from(80),
            leaf_floor_without_steps: Decimal::from(95),
        }
    }
}

impl ConfidencePolicy {
    pub fn new(leaf_floor: Decimal, leaf_floor_without_steps: Decimal) -> Self {
        ConfidencePolicy {
            leaf_floor: to_percent_range(leaf_floor),
            leaf_floor_without_steps: to_percent_range(leaf_floor_without_steps),
        }
    }

    /// Confidence shown for the species a leaf identified.
    pub fn leaf_confidence(&self, score: i64, steps: usize) -> Decimal {
        if steps == 0 {
            return confidence(score, steps).max(self.leaf_floor_without_steps);
        }
        confidence(score, steps).max(self.leaf_floor)
    }
}

fn to_percent_range(value: Decimal) -> Decimal {
    numeric::clamp(value, Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// `clamp(score / steps * 100, 0, 100)` rounded to two decimals; zero
/// when no steps have been taken.
pub fn confidence(score: i64, steps: usize) -> Decimal {
    if steps == 0 {
        return Decimal::ZERO;
    }
    let raw = Decimal::from(score) / Decimal::from(steps as u64) * Decimal::ONE_HUNDRED;
    numeric::round_dp(to_percent_range(raw), 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn zero_steps_is_zero() {
        assert_eq!(confidence(0, 0), Decimal::ZERO);
        assert_eq!(confidence(5, 0), Decimal::ZERO);
    }

    #[test]
    fn ratio_of_supporting_answers() {
        assert_eq!(confidence(2, 2), Decimal::ONE_HUNDRED);
        assert_eq!(confidence(1, 2), Decimal::from(50));
        assert_eq!(confidence(1, 3), Decimal::from_str("33.33").unwrap());
        assert_eq!(confidence(2, 3), Decimal::from_str("66.67").unwrap());
    }

    #[test]
    fn always_within_bounds() {
        for score in -3..=6 {
            for steps in 0..=4 {
                let c = confidence(score, steps);
                assert!(c >= Decimal::ZERO && c <= Decimal::ONE_HUNDRED);
            }
        }
    }

    #[test]
    fn leaf_floors() {
        let policy = ConfidencePolicy::default();
        assert_eq!(policy.leaf_confidence(0, 3), Decimal::from(80));
        assert_eq!(policy.leaf_confidence(3, 3), Decimal::ONE_HUNDRED);
        assert_eq!(policy.leaf_confidence(0, 0), Decimal::from(95));
    }

    #[test]
    fn configured_floors_are_clamped() {
        let policy = ConfidencePolicy::new(Decimal::from(120), Decimal::from(-4));
        assert_eq!(policy.leaf_floor, Decimal::ONE_HUNDRED);
        assert_eq!(policy.leaf_floor_without_steps, Decimal::ZERO);
    }
}
