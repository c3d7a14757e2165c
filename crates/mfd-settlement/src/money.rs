//! Fixed-point money and rate types.
//!
//! # Scale
//!
//! Every monetary amount and every rate (exchange rate, tax percentage) is an
//! `i64` at 1e-6 scale (micros): `1.00` = `1_000_000`.  Floats never take part
//! in arithmetic; JSON numbers are parsed through their decimal text.
//!
//! # Rounding
//!
//! - Multiplications (`convert`, `percent`) round half away from zero at the
//!   micro level.
//! - Rounding to 2 fractional digits happens only at presentation
//!   (`Display` / `Serialize` of [`Money`]), never in intermediate sums.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Scale factor: 1 unit = 1_000_000 micros (6 decimal places).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Micros per presented cent (2 decimal places).
const MICROS_PER_CENT: i64 = 10_000;

// ---------------------------------------------------------------------------
// FixedParseError
// ---------------------------------------------------------------------------

/// Errors returned when a decimal string cannot be represented in micros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedParseError {
    Empty,
    InvalidFormat(String),
    /// More than 6 fractional digits; rejected instead of silently rounding.
    TooManyDecimals(String),
    Overflow(String),
}

impl fmt::Display for FixedParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedParseError::Empty => write!(f, "empty decimal value"),
            FixedParseError::InvalidFormat(s) => write!(f, "invalid decimal value: {s}"),
            FixedParseError::TooManyDecimals(s) => {
                write!(f, "too many decimals (max 6): {s}")
            }
            FixedParseError::Overflow(s) => write!(f, "decimal value out of range: {s}"),
        }
    }
}

impl std::error::Error for FixedParseError {}

/// Parse a decimal string into integer micros deterministically.
///
/// Accepts an optional leading `+` or `-`.  Rejects more than 6 fractional
/// digits so no rounding ambiguity is ever introduced at the boundary.
pub fn parse_micros(s: &str) -> Result<i64, FixedParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(FixedParseError::Empty);
    }

    let (negative, body) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let mut parts = body.split('.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    if parts.next().is_some() || (int_part.is_empty() && frac_part.is_empty()) {
        return Err(FixedParseError::InvalidFormat(s.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(FixedParseError::InvalidFormat(s.to_string()));
    }
    if frac_part.len() > 6 {
        return Err(FixedParseError::TooManyDecimals(s.to_string()));
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<i64>()
            .map_err(|_| FixedParseError::Overflow(s.to_string()))?
    };

    let mut frac = frac_part.to_string();
    while frac.len() < 6 {
        frac.push('0');
    }
    let frac_val: i64 = frac
        .parse::<i64>()
        .map_err(|_| FixedParseError::InvalidFormat(s.to_string()))?;

    let magnitude = int_val
        .checked_mul(MICROS_PER_UNIT)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(|| FixedParseError::Overflow(s.to_string()))?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// `a * b / divisor`, rounded half away from zero.  `None` on overflow.
fn mul_div_round(a: i64, b: i64, divisor: i128) -> Option<i64> {
    let product = (a as i128).checked_mul(b as i128)?;
    let half = divisor / 2;
    let q = if product >= 0 {
        (product + half) / divisor
    } else {
        (product - half) / divisor
    };
    i64::try_from(q).ok()
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A fixed-point monetary amount at 1e-6 scale.
///
/// There is intentionally no `From<i64>`; use [`Money::from_micros`] or
/// [`Money::from_units`] so the scale is always explicit at the call site.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_micros(raw: i64) -> Self {
        Money(raw)
    }

    #[inline]
    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Whole units (e.g. `Money::from_units(50)` = 50.00).
    pub fn from_units(units: i64) -> Option<Money> {
        units.checked_mul(MICROS_PER_UNIT).map(Money)
    }

    pub fn parse(s: &str) -> Result<Money, FixedParseError> {
        parse_micros(s).map(Money)
    }

    #[inline]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Multiply a per-unit price by an integer quantity.
    #[inline]
    pub fn checked_mul_qty(self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Convert a foreign-currency amount into settlement currency.
    pub fn convert(self, rate: Rate) -> Option<Money> {
        mul_div_round(self.0, rate.0, MICROS_PER_UNIT as i128).map(Money)
    }

    /// `self * pct / 100`, where `pct` is a percentage (16 = 16%).
    pub fn percent(self, pct: Rate) -> Option<Money> {
        mul_div_round(self.0, pct.0, MICROS_PER_UNIT as i128 * 100).map(Money)
    }

    /// Round to 2 fractional digits, half away from zero.
    pub fn round_cents(self) -> Money {
        let half = MICROS_PER_CENT / 2;
        let cents = if self.0 >= 0 {
            self.0.saturating_add(half) / MICROS_PER_CENT
        } else {
            self.0.saturating_sub(half) / MICROS_PER_CENT
        };
        Money(cents.saturating_mul(MICROS_PER_CENT))
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Money {
    type Output = Money;
    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    #[inline]
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;
    #[inline]
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

/// Presentation form: 2 fractional digits (`"34.80"`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.round_cents().0 / MICROS_PER_CENT;
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedVisitor).map(Money)
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

/// A non-monetary multiplier at 1e-6 scale: exchange rates (40 = 40 local
/// units per foreign unit) and tax percentages (16 = 16%).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(i64);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    #[inline]
    pub const fn from_micros(raw: i64) -> Self {
        Rate(raw)
    }

    #[inline]
    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn from_units(units: i64) -> Option<Rate> {
        units.checked_mul(MICROS_PER_UNIT).map(Rate)
    }

    pub fn parse(s: &str) -> Result<Rate, FixedParseError> {
        parse_micros(s).map(Rate)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

/// Full precision with trailing zeros trimmed (`"40"`, `"36.125"`).
impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / MICROS_PER_UNIT as u64;
        let frac = abs % MICROS_PER_UNIT as u64;
        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let digits = format!("{frac:06}");
            write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedVisitor).map(Rate)
    }
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

/// Accepts JSON integers, JSON floats (through their shortest decimal text)
/// and decimal strings.
struct FixedVisitor;

impl<'de> de::Visitor<'de> for FixedVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a decimal number or decimal string with at most 6 fractional digits")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        v.checked_mul(MICROS_PER_UNIT)
            .ok_or_else(|| E::custom(FixedParseError::Overflow(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(MICROS_PER_UNIT))
            .ok_or_else(|| E::custom(FixedParseError::Overflow(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        if !v.is_finite() {
            return Err(E::custom("non-finite decimal value"));
        }
        parse_micros(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_micros(v).map_err(E::custom)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
