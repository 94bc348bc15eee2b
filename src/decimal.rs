//! Non-negative fixed-point amounts and their layout encoding.
//!
//! Amounts keep the full precision they were entered with. Rounding to the
//! column scale (2 for fiat, 10 for coins) happens only when a cell is
//! rendered, using round-half-away-from-zero.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

/// A non-negative decimal amount.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use crypto_report::Amount;
///
/// let brl = Amount::from_str("1500.80").unwrap();
/// assert_eq!(brl.encode(Amount::FIAT_SCALE), "150080");
///
/// let btc = Amount::from_str("0.0000001").unwrap();
/// assert_eq!(btc.encode(Amount::COIN_SCALE), "00000001000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Fractional digits of a fiat (BRL) column.
    pub const FIAT_SCALE: u32 = 2;

    /// Fractional digits of a coin quantity column.
    pub const COIN_SCALE: u32 = 10;

    /// Maximum digits of an encoded fiat cell.
    pub const FIAT_MAX_DIGITS: usize = 16;

    /// Maximum digits of an encoded coin cell.
    pub const COIN_MAX_DIGITS: usize = 30;

    /// Zero value.
    pub const ZERO: Self = Amount(Decimal::ZERO);

    /// Wraps `value`, returning `None` when it is negative.
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            None
        } else {
            Some(Amount(value.abs()))
        }
    }

    /// The unrounded decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Rounds to `scale` fractional digits.
    pub fn round_to(&self, scale: u32) -> Amount {
        Amount(
            self.0
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Renders the value with exactly `scale` implied fractional digits and
    /// no decimal point: `1500.8` at scale 2 is `150080`, zero is `000`.
    pub fn encode(&self, scale: u32) -> String {
        let rounded = self.round_to(scale).0;
        let integer = rounded.trunc();
        let fraction = (rounded - integer) * Decimal::from(10_i64.pow(scale));
        format!(
            "{}{:0>width$}",
            integer,
            fraction.trunc().to_string(),
            width = scale as usize
        )
    }

    /// Number of characters `encode(scale)` produces.
    pub fn encoded_width(&self, scale: u32) -> usize {
        self.encode(scale).len()
    }

    /// Adds two amounts, returning `None` on decimal overflow.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Amount::new(decimal)
            .ok_or_else(|| rust_decimal::Error::ErrorString("negative amount".to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
