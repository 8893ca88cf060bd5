use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// Every supported currency has two fractional digits, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a decimal string with two fractional digits.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// More than two fractional digits is an error rather than a silent truncation.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let (units_str, decimal_str) = digits.split_once('.').unwrap_or((digits, ""));
    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.bytes().all(|b| b.is_ascii_digit())
        || !decimal_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }
    if decimal_str.len() > 2 {
        return Err(ParseCentsError::TooManyDecimals);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::OutOfRange)?
    };
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        // A single digit like "5" means 50 cents
        1 => decimal_str.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => decimal_str.parse().map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    #[error("invalid money format")]
    InvalidFormat,

    #[error("money values have at most two fractional digits")]
    TooManyDecimals,

    #[error("money value out of range")]
    OutOfRange,
}

/// Serde adapter writing cents as `"12.34"` and reading either a decimal
/// string or a JSON number.
pub mod cents {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    use super::{Cents, format_cents, parse_cents};

    pub fn serialize<S: Serializer>(value: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_cents(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        deserializer.deserialize_any(CentsVisitor)
    }

    struct CentsVisitor;

    impl<'de> Visitor<'de> for CentsVisitor {
        type Value = Cents;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal amount with at most two fractional digits")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Cents, E> {
            parse_cents(v).map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cents, E> {
            v.checked_mul(100)
                .ok_or_else(|| E::custom("money value out of range"))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cents, E> {
            i64::try_from(v)
                .ok()
                .and_then(|v| v.checked_mul(100))
                .ok_or_else(|| E::custom("money value out of range"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cents, E> {
            if !v.is_finite() {
                return Err(E::custom("money value must be finite"));
            }
            // f64 Display never uses exponent notation, so the decimal parser applies.
            parse_cents(&v.to_string()).map_err(E::custom)
        }
    }

    /// Same as the parent adapter for optional fields; `null` and a missing
    /// field (with `#[serde(default)]`) both read as `None`.
    pub mod option {
        use std::fmt;

        use serde::de::{self, Visitor};
        use serde::{Deserializer, Serializer};

        use super::super::{Cents, format_cents};

        pub fn serialize<S: Serializer>(
            value: &Option<Cents>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(cents) => serializer.serialize_some(&format_cents(*cents)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Cents>, D::Error> {
            deserializer.deserialize_option(OptionVisitor)
        }

        struct OptionVisitor;

        impl<'de> Visitor<'de> for OptionVisitor {
            type Value = Option<Cents>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an optional decimal amount")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Self::Value, D::Error> {
                super::deserialize(deserializer).map(Some)
            }
        }
    }
}
