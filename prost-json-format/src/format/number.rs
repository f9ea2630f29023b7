use std::borrow::Cow;

use serde_json::{Number, Value};

use super::FormatError;

/// Relative tolerance applied to float/double range checks. A value printed at
/// the edge of the range may re-parse a little above it.
const EPSILON: f64 = 1e-6;

/// An unrounded decimal literal: `digits * 10^exponent`, negated when `negative`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Decimal {
    negative: bool,
    /// ASCII digits, most significant first, without leading zeros. Empty for zero.
    digits: Vec<u8>,
    exponent: i64,
}

impl Decimal {
    /// Parses `[+-]digits[.digits][(e|E)[+-]digits]`, requiring at least one
    /// mantissa digit.
    fn parse(text: &str) -> Option<Self> {
        let (negative, rest) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(index) => {
                let exponent = &rest[index + 1..];
                let unsigned = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
                if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                (&rest[..index], exponent.parse::<i64>().ok()?)
            }
            None => (rest, 0),
        };

        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let fraction_len = i64::try_from(fraction.len()).ok()?;
        let mut digits: Vec<u8> = integer
            .bytes()
            .chain(fraction.bytes())
            .skip_while(|b| *b == b'0')
            .collect();
        let mut exponent = exponent.checked_sub(fraction_len)?;
        while digits.last() == Some(&b'0') {
            digits.pop();
            exponent = exponent.checked_add(1)?;
        }

        Some(Self {
            negative,
            digits,
            exponent,
        })
    }

    /// Returns the exact integer value, or `None` if the literal has a
    /// fractional part or lies beyond the `i128` range.
    fn to_integer(&self) -> Option<i128> {
        if self.digits.is_empty() {
            return Some(0);
        }
        if self.exponent < 0 {
            return None;
        }
        let width = i64::try_from(self.digits.len()).ok()?.checked_add(self.exponent)?;
        if width > 39 {
            return None;
        }

        let mut magnitude: i128 = 0;
        for digit in &self.digits {
            magnitude = magnitude
                .checked_mul(10)?
                .checked_add(i128::from(digit - b'0'))?;
        }
        for _ in 0..self.exponent {
            magnitude = magnitude.checked_mul(10)?;
        }
        Some(if self.negative { -magnitude } else { magnitude })
    }

    /// The nearest double to this literal divided by ten.
    fn to_f64_scaled_down(&self) -> f64 {
        if self.digits.is_empty() {
            return 0.0;
        }
        let digits = String::from_utf8_lossy(&self.digits);
        let sign = if self.negative { "-" } else { "" };
        format!("{sign}{digits}e{}", self.exponent.saturating_sub(1))
            .parse::<f64>()
            .unwrap_or(f64::INFINITY)
    }
}

/// The textual form of a JSON scalar, as seen by the lexical parsers below.
/// Objects, arrays and null have none.
pub(crate) fn lexical(json: &Value) -> Option<Cow<'_, str>> {
    match json {
        Value::String(text) => Some(Cow::Borrowed(text.as_str())),
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        Value::Bool(flag) => Some(Cow::Borrowed(if *flag { "true" } else { "false" })),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn integer_from_str(text: &str) -> Option<i128> {
    Decimal::parse(text)?.to_integer()
}

pub(crate) fn int32_from_str(text: &str) -> Result<i32, FormatError> {
    if let Ok(value) = text.parse::<i32>() {
        return Ok(value);
    }
    // JSON does not distinguish 1 from 1.000, so any integral literal is accepted.
    integer_from_str(text)
        .and_then(|value| i32::try_from(value).ok())
        .ok_or_else(|| FormatError::new(format!("Not an int32 value: {text}")))
}

pub(crate) fn int64_from_str(text: &str) -> Result<i64, FormatError> {
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }
    integer_from_str(text)
        .and_then(|value| i64::try_from(value).ok())
        .ok_or_else(|| FormatError::new(format!("Not an int64 value: {text}")))
}

pub(crate) fn uint32_from_str(text: &str) -> Result<u32, FormatError> {
    let value = match text.parse::<i64>() {
        Ok(value) => i128::from(value),
        Err(_) => integer_from_str(text)
            .ok_or_else(|| FormatError::new(format!("Not an uint32 value: {text}")))?,
    };
    u32::try_from(value)
        .map_err(|_| FormatError::new(format!("Out of range uint32 value: {text}")))
}

pub(crate) fn uint64_from_str(text: &str) -> Result<u64, FormatError> {
    if let Ok(value) = text.parse::<u64>() {
        return Ok(value);
    }
    let value = integer_from_str(text)
        .ok_or_else(|| FormatError::new(format!("Not an uint64 value: {text}")))?;
    u64::try_from(value)
        .map_err(|_| FormatError::new(format!("Out of range uint64 value: {text}")))
}

pub(crate) fn bool_from_str(text: &str) -> Result<bool, FormatError> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FormatError::new(format!("Invalid bool value: {text}"))),
    }
}

fn special_float(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "Special values and range-checked finite values narrow to f32 as intended."
)]
pub(crate) fn float_from_str(text: &str) -> Result<f32, FormatError> {
    if let Some(value) = special_float(text) {
        return Ok(value as f32);
    }
    if Decimal::parse(text).is_none() {
        return Err(FormatError::new(format!("Not a float value: {text}")));
    }
    let value = text
        .parse::<f64>()
        .map_err(|_| FormatError::new(format!("Not a float value: {text}")))?;
    let limit = f64::from(f32::MAX) * (1.0 + EPSILON);
    if value.is_nan() || value.abs() > limit {
        return Err(FormatError::new(format!("Out of range float value: {text}")));
    }
    Ok(value as f32)
}

pub(crate) fn double_from_str(text: &str) -> Result<f64, FormatError> {
    if let Some(value) = special_float(text) {
        return Ok(value);
    }
    let decimal = Decimal::parse(text)
        .ok_or_else(|| FormatError::new(format!("Not a double value: {text}")))?;
    let value = text
        .parse::<f64>()
        .map_err(|_| FormatError::new(format!("Not a double value: {text}")))?;
    if value.is_finite() {
        return Ok(value);
    }
    // The literal overflowed; compare one decade lower so the bound stays finite.
    let limit = (f64::MAX / 10.0) * (1.0 + EPSILON);
    if decimal.to_f64_scaled_down().abs() > limit {
        return Err(FormatError::new(format!("Out of range double value: {text}")));
    }
    Ok(value)
}

pub(crate) fn print_double(value: f64) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_string())
    } else if value.is_infinite() {
        let token = if value.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        };
        Value::String(token.to_string())
    } else {
        Number::from_f64(value).map_or_else(|| Value::String(value.to_string()), Value::Number)
    }
}

pub(crate) fn print_float(value: f32) -> Value {
    if !value.is_finite() {
        return print_double(f64::from(value));
    }
    // Widen through the shortest decimal form so 0.1f32 prints as 0.1.
    let widened = value
        .to_string()
        .parse::<f64>()
        .unwrap_or_else(|_| f64::from(value));
    print_double(widened)
}
