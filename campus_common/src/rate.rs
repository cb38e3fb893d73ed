use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::Money;

const BPS_PER_UNIT: i128 = 10_000;

/// A percentage expressed in basis points (1% == 100 bps).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Rate(i64);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    pub const fn from_bps(bps: i64) -> Self {
        Self(bps)
    }

    pub const fn from_percent(percent: i64) -> Self {
        Self(percent * 100)
    }

    pub fn bps(&self) -> i64 {
        self.0
    }

    pub fn as_percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `amount * rate`, rounded half away from zero to the nearest cent.
    pub fn apply(&self, amount: Money) -> Money {
        self.apply_with_fixed(amount, Money::default())
    }

    /// `amount * rate + fixed`, rounded once.
    ///
    /// The fixed part is added before rounding so that the result carries a single rounding step.
    pub fn apply_with_fixed(&self, amount: Money, fixed: Money) -> Money {
        let numerator = i128::from(amount.value()) * i128::from(self.0) + i128::from(fixed.value()) * BPS_PER_UNIT;
        let half = BPS_PER_UNIT / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / BPS_PER_UNIT
        } else {
            (numerator - half) / BPS_PER_UNIT
        };
        #[allow(clippy::cast_possible_truncation)]
        Money::from_cents(rounded as i64)
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.as_percentage())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rounds_half_up() {
        let rate = Rate::from_percent(3);
        // 3% of 0.50 = 0.015 -> 0.02
        assert_eq!(rate.apply(Money::from_cents(50)), Money::from_cents(2));
        // 3% of 0.49 = 0.0147 -> 0.01
        assert_eq!(rate.apply(Money::from_cents(49)), Money::from_cents(1));
        assert_eq!(Rate::ZERO.apply(Money::from_major(1_000)), Money::default());
    }

    #[test]
    fn fixed_part_is_included_before_rounding() {
        let rate = Rate::from_bps(290);
        // 2.9% of 10.00 = 0.29, plus 0.30
        assert_eq!(rate.apply_with_fixed(Money::from_major(10), Money::from_cents(30)), Money::from_cents(59));
        // 2.9% of 12.34 = 0.35786, plus 0.30 = 0.65786 -> 0.66
        assert_eq!(rate.apply_with_fixed(Money::from_cents(1234), Money::from_cents(30)), Money::from_cents(66));
    }

    #[test]
    fn display() {
        assert_eq!(Rate::from_percent(5).to_string(), "5%");
        assert_eq!(Rate::from_bps(290).to_string(), "2.9%");
    }
}
