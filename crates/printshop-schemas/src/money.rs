//! Integer-micros currency amounts.
//!
//! Monetary fields travel through the remote document as decimal strings
//! (`"25"`, `"2.50"`). Internally they are `i64` micros (1 unit = 1_000_000
//! micros) so that parsing and comparison never touch floating point.
//!
//! | Direction              | Function          |
//! |------------------------|-------------------|
//! | admin form → internal  | [`Money::parse`]  |
//! | internal → document    | `Display` / serde |

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Scale factor: 1 currency unit = 1_000_000 micros (6 decimal places).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// MoneyError
// ---------------------------------------------------------------------------

/// Errors returned by [`Money::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Input was empty after trimming.
    Empty,
    /// Input is not a plain decimal number.
    Invalid(String),
    /// Amounts must be zero or positive.
    Negative(String),
    /// More than 6 decimal places cannot be represented without rounding.
    TooManyDecimalPlaces(String),
    /// Amount overflows `i64` micros.
    OutOfRange(String),
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::Empty => write!(f, "amount is empty"),
            MoneyError::Invalid(raw) => write!(f, "amount is not a number: '{raw}'"),
            MoneyError::Negative(raw) => write!(f, "amount must not be negative: '{raw}'"),
            MoneyError::TooManyDecimalPlaces(raw) => {
                write!(f, "amount has more than 6 decimal places: '{raw}'")
            }
            MoneyError::OutOfRange(raw) => write!(f, "amount is out of range: '{raw}'"),
        }
    }
}

impl std::error::Error for MoneyError {}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A non-negative currency amount stored as integer micros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    micros: i64,
}

impl Money {
    pub const ZERO: Money = Money { micros: 0 };

    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn from_units(units: i64) -> Self {
        Self {
            micros: units.saturating_mul(MICROS_PER_UNIT),
        }
    }

    pub fn micros(&self) -> i64 {
        self.micros
    }

    pub fn is_zero(&self) -> bool {
        self.micros == 0
    }

    /// Parse a decimal string deterministically.
    ///
    /// Accepts an optional leading `+` and an optional fractional part. Rejects
    /// blanks, signs other than `+`, exponents, thousands separators, negative
    /// values and more than 6 decimal places.
    pub fn parse(raw: &str) -> Result<Self, MoneyError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(MoneyError::Empty);
        }
        if s.starts_with('-') {
            return Err(MoneyError::Negative(s.to_string()));
        }
        let digits = s.strip_prefix('+').unwrap_or(s);

        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(MoneyError::Invalid(s.to_string()));
        }
        if frac_part.len() > 6 {
            return Err(MoneyError::TooManyDecimalPlaces(s.to_string()));
        }

        let int_val: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| MoneyError::OutOfRange(s.to_string()))?
        };
        let frac_val: i64 = format!("{frac_part:0<6}")
            .parse()
            .map_err(|_| MoneyError::Invalid(s.to_string()))?;

        int_val
            .checked_mul(MICROS_PER_UNIT)
            .and_then(|v| v.checked_add(frac_val))
            .map(Money::from_micros)
            .ok_or_else(|| MoneyError::OutOfRange(s.to_string()))
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

/// Shortest decimal rendering: `25`, `2.5`, `0.000001`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.micros < 0 { "-" } else { "" };
        let abs = self.micros.unsigned_abs();
        let units = abs / MICROS_PER_UNIT as u64;
        let frac = abs % MICROS_PER_UNIT as u64;
        if frac == 0 {
            write!(f, "{sign}{units}")
        } else {
            let frac = format!("{frac:06}");
            write!(f, "{sign}{units}.{}", frac.trim_end_matches('0'))
        }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Documents written by earlier tooling may carry amounts as JSON numbers or
/// as blank strings; both are accepted on load.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        if v.trim().is_empty() {
            return Ok(Money::ZERO);
        }
        Money::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Money::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Money::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount is not finite"));
        }
        Money::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::parse("25").unwrap(), Money::from_units(25));
        assert_eq!(Money::parse(" 2.50 ").unwrap().micros(), 2_500_000);
        assert_eq!(Money::parse(".5").unwrap().micros(), 500_000);
        assert_eq!(Money::parse("+3").unwrap(), Money::from_units(3));
        assert_eq!(Money::parse("0.000001").unwrap().micros(), 1);
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert_eq!(Money::parse(""), Err(MoneyError::Empty));
        assert!(matches!(Money::parse("abc"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("$25"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("1,000"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("1e3"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("."), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("1.2.3"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_and_overprecise_amounts() {
        assert!(matches!(Money::parse("-1"), Err(MoneyError::Negative(_))));
        assert!(matches!(
            Money::parse("0.0000001"),
            Err(MoneyError::TooManyDecimalPlaces(_))
        ));
        assert!(matches!(
            Money::parse("99999999999999999999"),
            Err(MoneyError::OutOfRange(_))
        ));
    }

    #[test]
    fn display_is_shortest_decimal() {
        assert_eq!(Money::ZERO.to_string(), "0");
        assert_eq!(Money::from_units(25).to_string(), "25");
        assert_eq!(Money::from_micros(2_500_000).to_string(), "2.5");
        assert_eq!(Money::from_micros(1).to_string(), "0.000001");
    }

    #[test]
    fn serializes_as_string() {
        let v = serde_json::to_value(Money::from_micros(5_250_000)).unwrap();
        assert_eq!(v, serde_json::json!("5.25"));
    }

    #[test]
    fn deserializes_legacy_shapes() {
        let m: Money = serde_json::from_value(serde_json::json!("0")).unwrap();
        assert!(m.is_zero());
        let m: Money = serde_json::from_value(serde_json::json!("")).unwrap();
        assert!(m.is_zero());
        let m: Money = serde_json::from_value(serde_json::json!(12)).unwrap();
        assert_eq!(m, Money::from_units(12));
        let m: Money = serde_json::from_value(serde_json::json!(7.5)).unwrap();
        assert_eq!(m.micros(), 7_500_000);
        assert!(serde_json::from_value::<Money>(serde_json::json!("ten")).is_err());
    }
}
