//! # Money Module
//!
//! Provides the `Money` type for handling monetary values exactly.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Summing 40 line items at 12.5% tax in f64 drifts by fractions of a    │
//! │  paisa, and floor() on the net price then lands on the wrong rupee.    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (two fractional digits)              │
//! │    236.00 is stored as 23600                                            │
//! │    Sums are exact, order-independent, and floor() is integer division  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_minor(10050);      // 100.50
//! let doubled = price * 2;                   // 201.00
//! let (payable, remainder) = doubled.floor_to_major();
//! assert_eq!(payable.major(), 201);
//! assert!(remainder.is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

/// Number of minor units in one major unit (two fractional digits).
pub const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (paise, cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: the balance payable can go negative on underpayment
/// - **Single field tuple struct**: zero-cost over i64
/// - **Serialized as the raw minor-unit integer**
///
/// ## Where Money Flows
/// ```text
/// CatalogEntry.unit_price ──► SettledLine.subtotal ──► tax_payable
///                                      │                    │
///                                      ▼                    ▼
///                          InvoiceTotals.total_without_tax + total_tax
///                                      │
///                                      ▼
///                             net_price ──► floor ──► rounded_net_price
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a value from minor units.
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// assert_eq!(Money::from_minor(1099).minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a value from whole currency units.
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// assert_eq!(Money::from_major(250).minor(), 25000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_MAJOR)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the fractional portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Splits the value into a floored whole-unit amount and the discarded
    /// fraction.
    ///
    /// Floors toward negative infinity, so the remainder is always in
    /// `[0, 1)` major units and `floored + remainder == self`.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let (floored, rest) = Money::from_minor(23675).floor_to_major();
    /// assert_eq!(floored.minor(), 23600);
    /// assert_eq!(rest.minor(), 75);
    /// ```
    pub const fn floor_to_major(&self) -> (Money, Money) {
        let whole = self.0.div_euclid(MINOR_PER_MAJOR) * MINOR_PER_MAJOR;
        (Money(whole), Money(self.0 - whole))
    }

    /// Calculates tax on this amount, rounding half-up to the minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so
    /// large carts cannot overflow.
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_major(200);
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1800)); // 18%
    /// assert_eq!(tax, Money::from_major(36));
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_minor = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_minor(tax_minor as i64)
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as `236.75`; currency symbols are a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
