//! Exact split arithmetic over integer minor units.
//!
//! RULE: no binary floating point touches money. Amounts are integers,
//! fractions are `Decimal`, and the fractional penny lost to flooring is
//! carried as an exact `Decimal` until the last split of a partition.

use crate::{
    error::{AllocError, AllocResult},
    types::MinorUnits,
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Result of splitting an amount by one fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// floor(amount × fraction)
    pub allocated: MinorUnits,
    /// amount × fraction − allocated, not yet rounded.
    pub remainder: Decimal,
}

/// Split `amount` by `fraction`, flooring to whole minor units.
///
/// `fraction` must lie in [0, 1] and `amount` must be non-negative.
pub fn split(amount: MinorUnits, fraction: Decimal) -> AllocResult<Split> {
    if amount < 0 {
        return Err(AllocError::InvalidAmount { amount });
    }
    if fraction < Decimal::ZERO || fraction > Decimal::ONE {
        return Err(AllocError::InvalidSplit { split: fraction });
    }

    let exact = Decimal::from(amount) * fraction;
    let floored = exact.floor();
    let remainder = (exact - floored).abs();
    let allocated = MinorUnits::try_from(floored)
        .map_err(|_| AllocError::InvalidAmount { amount })?;

    Ok(Split { allocated, remainder })
}

/// Running total of flooring remainders across one partition of fractions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemainderCarry {
    total: Decimal,
}

impl RemainderCarry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, remainder: Decimal) {
        self.total += remainder;
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_zero(&self) -> bool {
        self.total.is_zero()
    }

    /// The carried remainder rounded to whole minor units (half away from zero).
    pub fn settle(&self) -> MinorUnits {
        let rounded = self
            .total
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        // Sum of remainders is bounded by the number of splits.
        MinorUnits::try_from(rounded).unwrap_or(0)
    }
}
