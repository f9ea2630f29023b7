use std::fmt::Write as _;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use prost_types::{Duration, Timestamp};

use super::FormatError;

/// 0001-01-01T00:00:00Z
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
/// Ten thousand years.
const MAX_DURATION_SECONDS: i64 = 315_576_000_000;
const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Writes `.fff`, `.ffffff` or `.fffffffff`, whichever is shortest without loss.
/// Nothing is written for zero.
fn push_fraction(out: &mut String, nanos: u32) {
    if nanos == 0 {
        return;
    }
    // Writing to a String cannot fail.
    let _ = if nanos % 1_000_000 == 0 {
        write!(out, ".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        write!(out, ".{:06}", nanos / 1_000)
    } else {
        write!(out, ".{nanos:09}")
    };
}

/// Parses up to nine fraction digits into nanoseconds.
fn parse_fraction(fraction: &str) -> Option<i32> {
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let digits: i32 = fraction.parse().ok()?;
    let scale = 10_i32.checked_pow(9 - u32::try_from(fraction.len()).ok()?)?;
    digits.checked_mul(scale)
}

pub(crate) fn format_timestamp(value: &Timestamp) -> Result<String, FormatError> {
    let invalid = || {
        FormatError::new(format!(
            "Timestamp is not valid. Seconds ({}) must be in range [{MIN_TIMESTAMP_SECONDS}, \
             {MAX_TIMESTAMP_SECONDS}]. Nanos ({}) must be in range [0, 999999999].",
            value.seconds, value.nanos
        ))
    };
    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&value.seconds) {
        return Err(invalid());
    }
    let nanos = u32::try_from(value.nanos)
        .ok()
        .filter(|nanos| *nanos < 1_000_000_000)
        .ok_or_else(invalid)?;
    let datetime = Utc
        .timestamp_opt(value.seconds, nanos)
        .single()
        .ok_or_else(invalid)?;

    let mut formatted = String::with_capacity(30);
    let _ = write!(
        formatted,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        datetime.year(),
        datetime.month(),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    );
    push_fraction(&mut formatted, nanos);
    formatted.push('Z');
    Ok(formatted)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<Timestamp, FormatError> {
    let invalid = || FormatError::new(format!("Failed to parse timestamp: {text}"));

    // RFC 3339 permits lowercase separators; proto3 JSON does not.
    if text.contains('t') || text.contains('z') {
        return Err(invalid());
    }
    let Some(time_start) = text.find('T') else {
        return Err(invalid());
    };
    if let Some(dot) = text[time_start..].find('.') {
        let fraction_start = time_start + dot + 1;
        let fraction_len = text[fraction_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if fraction_len == 0 || fraction_len > 9 {
            return Err(invalid());
        }
    }

    let datetime = DateTime::parse_from_rfc3339(text).map_err(|_| invalid())?;
    let utc = datetime.with_timezone(&Utc);
    let seconds = utc.timestamp();
    // Leap seconds surface as nanos past one second.
    let nanos = i32::try_from(utc.timestamp_subsec_nanos())
        .ok()
        .filter(|nanos| *nanos < NANOS_PER_SECOND)
        .ok_or_else(invalid)?;
    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds) {
        return Err(invalid());
    }
    Ok(Timestamp { seconds, nanos })
}

pub(crate) fn format_duration(value: &Duration) -> Result<String, FormatError> {
    let Duration { seconds, nanos } = *value;
    let signs_agree = !((seconds < 0 && nanos > 0) || (seconds > 0 && nanos < 0));
    if !(-MAX_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds)
        || nanos <= -NANOS_PER_SECOND
        || nanos >= NANOS_PER_SECOND
        || !signs_agree
    {
        return Err(FormatError::new(format!(
            "Duration is not valid. Seconds ({seconds}) must be in range \
             [-{MAX_DURATION_SECONDS}, {MAX_DURATION_SECONDS}]. Nanos ({nanos}) must be in \
             range [-999999999, 999999999]. Nanos must have the same sign as seconds."
        )));
    }

    let mut formatted = String::new();
    if seconds < 0 || nanos < 0 {
        formatted.push('-');
    }
    let _ = write!(formatted, "{}", seconds.unsigned_abs());
    push_fraction(&mut formatted, nanos.unsigned_abs());
    formatted.push('s');
    Ok(formatted)
}

pub(crate) fn parse_duration(text: &str) -> Result<Duration, FormatError> {
    let invalid = || FormatError::new(format!("Failed to parse duration: {text}"));

    let body = text.strip_suffix('s').ok_or_else(invalid)?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (whole, fraction) = match body.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (body, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let seconds: i64 = whole.parse().map_err(|_| invalid())?;
    let nanos = match fraction {
        Some(fraction) => parse_fraction(fraction).ok_or_else(invalid)?,
        None => 0,
    };
    if seconds > MAX_DURATION_SECONDS {
        return Err(invalid());
    }

    Ok(if negative {
        Duration {
            seconds: -seconds,
            nanos: -nanos,
        }
    } else {
        Duration { seconds, nanos }
    })
}
