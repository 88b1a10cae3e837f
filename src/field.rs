//! Node attributes and their display formatting.
//!
//! Every attribute value is kept as the raw string it was imported with. A
//! [`FormatVariant`] code picks how a numeric value is rendered for labels;
//! the same rules apply to node attributes and to aggregation results.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::errors::FormatError;

/// An attribute on a node, one data column of the imported row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_variant: Option<FormatVariant>,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            label: None,
            format_variant: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_format_variant(mut self, variant: FormatVariant) -> Self {
        self.format_variant = Some(variant);
        self
    }

    /// Label when set, key otherwise
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    pub fn formatted_value(&self) -> String {
        format_value(&self.value, self.format_variant)
    }

    /// The value as a decimal, if it is one
    pub fn numeric_value(&self) -> Option<BigDecimal> {
        parse_decimal(&self.value)
    }
}

/// Display format code attached to a field or an aggregation row.
///
/// Serialized as its integer code.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum FormatVariant {
    /// Plain decimal, trailing zeros trimmed
    #[default]
    Raw,
    /// Rounded to a whole number with thousands separators
    Integer,
    /// Two decimal places with thousands separators
    Decimal2,
    /// Fraction rendered as a percentage with two decimal places
    Percent,
    /// Epoch milliseconds as `YYYY-MM-DD` (UTC)
    Date,
    /// Epoch milliseconds as `YYYY-MM-DD HH:MM` (UTC)
    DateTime,
}

impl TryFrom<u8> for FormatVariant {
    type Error = FormatError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FormatVariant::Raw),
            1 => Ok(FormatVariant::Integer),
            2 => Ok(FormatVariant::Decimal2),
            3 => Ok(FormatVariant::Percent),
            4 => Ok(FormatVariant::Date),
            5 => Ok(FormatVariant::DateTime),
            other => Err(FormatError::UnknownVariant(other)),
        }
    }
}

impl From<FormatVariant> for u8 {
    fn from(variant: FormatVariant) -> Self {
        match variant {
            FormatVariant::Raw => 0,
            FormatVariant::Integer => 1,
            FormatVariant::Decimal2 => 2,
            FormatVariant::Percent => 3,
            FormatVariant::Date => 4,
            FormatVariant::DateTime => 5,
        }
    }
}

impl Display for FormatVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FormatVariant::Raw => "raw",
            FormatVariant::Integer => "integer",
            FormatVariant::Decimal2 => "decimal2",
            FormatVariant::Percent => "percent",
            FormatVariant::Date => "date",
            FormatVariant::DateTime => "datetime",
        };
        write!(f, "{}", name)
    }
}

/// Decimal exponent bounds of a finite, non-zero `f64`
const MAX_EXPONENT: i64 = 308;
const MIN_EXPONENT: i64 = -324;

/// Parses a raw attribute value as a finite decimal.
///
/// Blank strings, anything `BigDecimal` rejects (including `NaN` and `inf`)
/// and magnitudes past the `f64` range yield `None`. Magnitudes below the
/// smallest `f64` read as zero.
pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = BigDecimal::from_str(trimmed).ok()?;
    if value.is_zero() {
        return Some(BigDecimal::zero());
    }

    let (_, scale) = value.as_bigint_and_exponent();
    let exponent = (value.digits() as i64 - 1).saturating_sub(scale);
    if exponent > MAX_EXPONENT {
        return None;
    }
    if exponent < MIN_EXPONENT {
        return Some(BigDecimal::zero());
    }

    value.to_f64().filter(|f| f.is_finite())?;
    Some(value)
}

/// Converts a decimal to the nearest `f64`.
pub fn decimal_to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Formats a raw attribute value; non-numeric values are returned unchanged.
pub fn format_value(raw: &str, variant: Option<FormatVariant>) -> String {
    match parse_decimal(raw) {
        Some(value) => format_decimal(&value, variant),
        None => raw.to_string(),
    }
}

pub fn format_decimal(value: &BigDecimal, variant: Option<FormatVariant>) -> String {
    match variant.unwrap_or_default() {
        FormatVariant::Raw => plain_string(&value.normalized()),
        FormatVariant::Integer => group_thousands(&fixed(value, 0)),
        FormatVariant::Decimal2 => group_thousands(&fixed(value, 2)),
        FormatVariant::Percent => {
            let percent = value.clone() * BigDecimal::from(100);
            format!("{}%", fixed(&percent, 2))
        }
        FormatVariant::Date => format_epoch_millis(value, "%Y-%m-%d"),
        FormatVariant::DateTime => format_epoch_millis(value, "%Y-%m-%d %H:%M"),
    }
}

fn format_epoch_millis(value: &BigDecimal, pattern: &str) -> String {
    value
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|dt| dt.format(pattern).to_string())
        .unwrap_or_else(|| plain_string(&value.normalized()))
}

/// Rounds half away from zero to `places` decimals and renders exactly that many.
fn fixed(value: &BigDecimal, places: i64) -> String {
    plain_string(&value.with_scale_round(places, RoundingMode::HalfUp))
}

/// Renders a decimal without exponent notation, keeping its scale.
fn plain_string(value: &BigDecimal) -> String {
    let (digits, scale) = value.as_bigint_and_exponent();
    let digits = digits.to_string();
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };

    if scale <= 0 {
        let zeros = "0".repeat(scale.unsigned_abs() as usize);
        if digits == "0" {
            return "0".to_string();
        }
        return format!("{}{}{}", sign, digits, zeros);
    }

    let scale = scale as usize;
    if digits.len() > scale {
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        format!("{}{}.{}", sign, int_part, frac_part)
    } else {
        format!("{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
    }
}

fn group_thousands(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
