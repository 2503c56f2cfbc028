//! Percentage helpers shared by every analyzer.
//!
//! RULE: Thresholds compare unrounded values. Rounding to one decimal place
//! happens only when a figure is written into an output struct.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const HUNDRED: Decimal = dec!(100);

/// `numerator / denominator × 100`, or zero when the denominator is zero.
pub fn percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator * HUNDRED
    }
}

pub fn percent_of_counts(numerator: usize, denominator: usize) -> Decimal {
    percent(Decimal::from(numerator), Decimal::from(denominator))
}

/// Relative change from `previous` to `current` in percent; zero when
/// `previous` is zero.
pub fn percent_change(previous: Decimal, current: Decimal) -> Decimal {
    percent(current - previous, previous)
}

/// Round half away from zero to one decimal place.
pub fn round_pct(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Mean of `total` over `count` items, zero for an empty set.
pub fn mean(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count)
    }
}
