//! Fixed-point currency arithmetic for the auction engine.
//!
//! All amounts are stored as integer minor units (cents). Arithmetic is
//! exact; the only place rounding happens is in percentage scaling and CPM
//! derivation, where ties round half away from zero so that repeated runs
//! over the same data always produce the same cents.

use {
    serde::{Deserialize, Serialize},
    std::{fmt, iter::Sum},
};

/// A monetary amount in minor units (cents).
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::AddAssign,
    derive_more::SubAssign,
    derive_more::Neg,
)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    /// Amount from whole currency units.
    pub const fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    /// Amount from minor units (cents).
    pub const fn from_minor(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn as_minor(self) -> i64 {
        self.0
    }

    /// Whole currency units, fractional cents discarded toward zero.
    pub const fn as_major(self) -> i64 {
        self.0 / 100
    }

    /// Lossy conversion for ratio computations and reporting. Never feed the
    /// result back into stored amounts.
    pub fn as_major_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Scales the amount by a percentage, rounding half away from zero.
    pub fn percent_of(self, percent: Percent) -> Self {
        Self(div_round(
            i128::from(self.0) * i128::from(percent.as_hundredths()),
            10_000,
        ))
    }

    /// Cost per thousand views for a total cost over an audience estimate.
    /// Zero audiences price at zero rather than dividing by nothing.
    pub fn per_mille(self, views: u64) -> Self {
        if views == 0 {
            return Self::ZERO;
        }
        Self(div_round(
            i128::from(self.0) * 1000,
            i128::try_from(views).expect("audience fits i128"),
        ))
    }

    /// Total cost implied by this amount as a CPM over an audience estimate.
    pub fn times_mille(self, views: u64) -> Self {
        Self(div_round(
            i128::from(self.0) * i128::try_from(views).expect("audience fits i128"),
            1000,
        ))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc.saturating_add(x))
    }
}

/// A percentage stored in hundredths of a percent, so `Percent::new(12_50)`
/// is 12.5%.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Self = Self(0);
    pub const HUNDRED: Self = Self(10_000);

    pub const fn new(hundredths: i64) -> Self {
        Self(hundredths)
    }

    pub const fn from_whole(percent: i64) -> Self {
        Self(percent * 100)
    }

    pub const fn as_hundredths(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 100% plus this percentage, for markups.
    pub const fn markup(self) -> Self {
        Self(10_000 + self.0)
    }

    /// 100% minus this percentage, for discounts.
    pub const fn discount(self) -> Self {
        Self(10_000 - self.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}%", abs / 100, abs % 100)
    }
}

/// Division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(denominator > 0);
    let half = denominator / 2;
    let adjusted = if numerator >= 0 {
        numerator + half
    } else {
        numerator - half
    };
    i64::try_from(adjusted / denominator).expect("amount fits i64")
}
