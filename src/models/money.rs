use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign},
};

use crate::error::AppError;

/// An exact monetary amount in cents (e.g. 1599 = $15.99).
///
/// All subscription cost arithmetic happens on this type so repeated aggregation never
/// drifts the way floating point does.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl TryFrom<&BigDecimal> for Money {
    type Error = AppError;

    /// Rounds to the nearest cent. Negative or out-of-range amounts are rejected.
    fn try_from(amount: &BigDecimal) -> Result<Self, Self::Error> {
        if *amount < BigDecimal::zero() {
            return Err(AppError::InvalidInput(format!(
                "monetary amount must not be negative: {}",
                amount
            )));
        }

        (amount * BigDecimal::from(100_i64))
            .round(0)
            .to_i64()
            .map(Money)
            .ok_or_else(|| {
                AppError::InvalidInput(format!("monetary amount out of range: {}", amount))
            })
    }
}

impl From<Money> for BigDecimal {
    fn from(money: Money) -> Self {
        BigDecimal::new(money.cents().into(), 2)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents() < 0 { "-" } else { "" };
        let abs = self.cents().unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}
