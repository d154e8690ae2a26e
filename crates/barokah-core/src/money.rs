//! # Money Module
//!
//! Provides the `Money` type for handling rupiah amounts exactly.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Product prices are stored as DECIMAL(10,2) rupiah values.             │
//! │  A float cannot represent Rp 1.234.567,89 exactly, and summing a       │
//! │  cart of bricks, cement and rebar in f64 drifts by fractions of a sen. │
//! │                                                                         │
//! │  OUR SOLUTION: Integer sen (1/100 rupiah)                              │
//! │    Rp 25.000,00 = 2_500_000 sen                                        │
//! │    Every total, discount and subtotal is exact                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use barokah_core::money::Money;
//!
//! let cement = Money::from_major(65_000);          // Rp 65.000,00
//! let line = cement.multiply_quantity(10);          // Rp 650.000,00
//! let discount = line.percentage_discount(10);      // Rp 65.000,00
//! assert_eq!((line - discount).major_units(), 585_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in sen (1/100 rupiah).
///
/// ## Where Money Flows
/// ```text
/// Product.price_cents ──► OrderLine.unit_price_cents ──► line subtotal
///                                                          │
///                       DiscountDecision.percent ──────────┤
///                                                          ▼
///                         Order.total_cents = Σ line subtotals + shipping
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from sen (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole rupiah.
    ///
    /// ## Example
    /// ```rust
    /// use barokah_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(5_000_000).cents(), 500_000_000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Creates a Money value from rupiah and sen.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -Rp 5,50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in sen.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupiah portion (truncated toward zero).
    #[inline]
    pub const fn major_units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the sen portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use barokah_core::money::Money;
    ///
    /// let brick = Money::from_cents(95_000); // Rp 950,00
    /// assert_eq!(brick.multiply_quantity(1_000).cents(), 95_000_000);
    /// ```
    ///
    /// Saturates instead of wrapping. Validated prices and quantities never
    /// get close (see `MAX_PRICE_CENTS`).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Computes a percentage discount amount, truncated to whole rupiah.
    ///
    /// ## Rounding Rule
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  discount = trunc(amount × percent / 100) in WHOLE rupiah           │
    /// │                                                                     │
    /// │  Rp 1.234.567,89 × 10%  = Rp 123.456,789                            │
    /// │                         → Rp 123.456,00  (sen dropped)             │
    /// │                                                                     │
    /// │  The discount is always a multiple of 100 sen, and never larger   │
    /// │  than the exact percentage. Customers never get a partial rupiah.  │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use barokah_core::money::Money;
    ///
    /// let subtotal = Money::from_major_minor(1_234_567, 89);
    /// assert_eq!(subtotal.percentage_discount(10), Money::from_major(123_456));
    /// ```
    pub fn percentage_discount(&self, percent: u32) -> Money {
        // i128 keeps large carts from overflowing before the division
        let whole_rupiah = self.0 as i128 * percent as i128 / 10_000;
        Money::from_cents((whole_rupiah * 100) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders Indonesian formatting: `Rp 5.000.000,00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.major_units().unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}Rp {},{:02}", sign, grouped, self.minor_part())
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
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
