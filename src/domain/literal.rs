// SPDX-License-Identifier: MIT OR Apache-2.0

//! Literal parsers shared by the coercion engine.
//!
//! Integers follow base-prefix rules: an optional sign (signed targets only),
//! then `0x`, `0o`, `0b` or a bare leading `0` for octal, with `_` allowed
//! between digits. The magnitude is parsed wide and then narrowed, so the
//! width of the target decides between a range error and success.
//!
//! Floats accept decimal literals with the same `_` rule, `inf`, `nan`, and
//! hexadecimal literals with a binary exponent such as `0x1.8p3`.

use crate::domain::errors::CoerceError;
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Longest fraction that still fits the fixed-point arithmetic below.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parses a signed integer and narrows it to `T`.
pub(crate) fn parse_signed<T: TryFrom<i128>>(raw: &str) -> Result<T, CoerceError> {
    let (negative, body) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let magnitude = i128::try_from(parse_magnitude(body)?).map_err(|_| CoerceError::OutOfRange)?;
    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).map_err(|_| CoerceError::OutOfRange)
}

/// Parses an unsigned integer and narrows it to `T`. Signs are rejected.
pub(crate) fn parse_unsigned<T: TryFrom<u128>>(raw: &str) -> Result<T, CoerceError> {
    T::try_from(parse_magnitude(raw)?).map_err(|_| CoerceError::OutOfRange)
}

fn parse_magnitude(s: &str) -> Result<u128, CoerceError> {
    let (radix, digits) = match s.as_bytes() {
        [b'0', b'x' | b'X', ..] => (16, &s[2..]),
        [b'0', b'b' | b'B', ..] => (2, &s[2..]),
        [b'0', b'o' | b'O', ..] => (8, &s[2..]),
        [b'0', _, ..] => (8, &s[1..]),
        _ => (10, s),
    };

    if !underscores_ok(s) {
        return Err(CoerceError::Syntax);
    }

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_digit(radix)) {
        return Err(CoerceError::Syntax);
    }

    // only overflow is left once every character is a valid digit
    u128::from_str_radix(&cleaned, radix).map_err(|_| CoerceError::OutOfRange)
}

/// Underscores may only separate digits, or follow a base prefix.
fn underscores_ok(s: &str) -> bool {
    let b = s.as_bytes();
    let mut saw = b'^';
    let mut i = 0;
    let mut hex = false;

    if b.len() >= 2 && b[0] == b'0' && matches!(b[1].to_ascii_lowercase(), b'b' | b'o' | b'x') {
        i = 2;
        saw = b'0';
        hex = b[1].to_ascii_lowercase() == b'x';
    }

    while i < b.len() {
        let c = b[i];
        if c.is_ascii_digit() || (hex && c.is_ascii_hexdigit()) {
            saw = b'0';
        } else if c == b'_' {
            if saw != b'0' {
                return false;
            }
            saw = b'_';
        } else {
            if saw == b'_' {
                return false;
            }
            saw = b'!';
        }
        i += 1;
    }

    saw != b'_'
}

fn is_infinity_literal(raw: &str) -> bool {
    let unsigned = raw.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

/// Parses a 64-bit float; finite literals that overflow are range errors.
pub(crate) fn parse_f64(raw: &str) -> Result<f64, CoerceError> {
    let value = match hex_float(raw) {
        Some(parsed) => parsed?,
        None => decimal_float(raw)?
            .parse()
            .map_err(|_| CoerceError::Syntax)?,
    };
    if value.is_infinite() && !is_infinity_literal(raw) {
        return Err(CoerceError::OutOfRange);
    }
    Ok(value)
}

/// Parses a 32-bit float; finite literals that overflow are range errors.
pub(crate) fn parse_f32(raw: &str) -> Result<f32, CoerceError> {
    let value = match hex_float(raw) {
        Some(parsed) => parsed? as f32,
        None => decimal_float(raw)?
            .parse()
            .map_err(|_| CoerceError::Syntax)?,
    };
    if value.is_infinite() && !is_infinity_literal(raw) {
        return Err(CoerceError::OutOfRange);
    }
    Ok(value)
}

/// Strips digit separators from a decimal float literal.
fn decimal_float(raw: &str) -> Result<String, CoerceError> {
    if !raw.contains('_') {
        return Ok(raw.to_string());
    }
    if !underscores_ok(raw.trim_start_matches(['+', '-'])) {
        return Err(CoerceError::Syntax);
    }
    Ok(raw.chars().filter(|c| *c != '_').collect())
}

/// Parses `[sign]0x<mantissa>p<exponent>`; `None` if `raw` is not hexadecimal.
fn hex_float(raw: &str) -> Option<Result<f64, CoerceError>> {
    let (negative, body) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))?;
    Some(hex_magnitude(body, digits).map(|v| if negative { -v } else { v }))
}

fn hex_magnitude(body: &str, digits: &str) -> Result<f64, CoerceError> {
    let (mantissa, exponent) = digits.split_once(['p', 'P']).ok_or(CoerceError::Syntax)?;
    if !underscores_ok(&body[..2 + mantissa.len()]) || !underscores_ok(exponent) {
        return Err(CoerceError::Syntax);
    }

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let int_digits = hex_digits(int_part)?;
    let frac_digits = hex_digits(frac_part)?;
    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(CoerceError::Syntax);
    }

    let exponent: String = exponent.chars().filter(|c| *c != '_').collect();
    let (exp_negative, exp_digits) = match exponent.as_bytes().first() {
        Some(b'-') => (true, &exponent[1..]),
        Some(b'+') => (false, &exponent[1..]),
        _ => (false, exponent.as_str()),
    };
    if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoerceError::Syntax);
    }
    // saturates far beyond the reach of any float
    let magnitude = exp_digits
        .bytes()
        .fold(0i64, |acc, d| (acc * 10 + i64::from(d - b'0')).min(1 << 20));
    let mut exp = if exp_negative { -magnitude } else { magnitude };

    // keep 60 significant bits; extra integer digits only scale the value
    let mut significand: u64 = 0;
    for d in int_digits {
        if significand >> 60 == 0 {
            significand = (significand << 4) | u64::from(d);
        } else {
            exp += 4;
        }
    }
    for d in frac_digits {
        if significand >> 60 == 0 {
            significand = (significand << 4) | u64::from(d);
            exp -= 4;
        }
    }

    Ok(scale_by_two(significand as f64, exp))
}

fn hex_digits(s: &str) -> Result<Vec<u32>, CoerceError> {
    s.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_digit(16).ok_or(CoerceError::Syntax))
        .collect()
}

fn scale_by_two(mut value: f64, mut exp: i64) -> f64 {
    while exp > 1000 && value.is_finite() {
        value *= 2f64.powi(1000);
        exp -= 1000;
    }
    while exp < -1000 && value != 0.0 {
        value *= 2f64.powi(-1000);
        exp += 1000;
    }
    value * 2f64.powi(exp.clamp(-2000, 2000) as i32)
}

/// Parses the boolean tokens `1 t T TRUE true True` and `0 f F FALSE false False`.
pub(crate) fn parse_bool(raw: &str) -> Result<bool, CoerceError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(CoerceError::Syntax),
    }
}

/// Parses a duration literal such as `300ms`, `1.5h` or `1h5m10s`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// needs no unit. Durations are capped at `i64::MAX` nanoseconds and may not
/// be negative.
pub(crate) fn parse_duration(raw: &str) -> Result<Duration, CoerceError> {
    let mut s = raw;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(CoerceError::Syntax);
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, rest) = s.split_at(int_len);
        s = rest;

        let mut frac_part = "";
        if let Some(rest) = s.strip_prefix('.') {
            let frac_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &rest[..frac_len];
            s = &rest[frac_len..];
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(CoerceError::Syntax);
            }
        } else if int_part.is_empty() {
            return Err(CoerceError::Syntax);
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        if unit_len == 0 {
            return Err(CoerceError::Syntax);
        }
        let (unit, rest) = s.split_at(unit_len);
        s = rest;

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => NANOS_PER_MINUTE,
            "h" => NANOS_PER_HOUR,
            _ => return Err(CoerceError::Syntax),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| CoerceError::OutOfRange)?
        };
        let mut nanos = whole.checked_mul(scale).ok_or(CoerceError::OutOfRange)?;

        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
            let numerator: u128 = digits.parse().map_err(|_| CoerceError::Syntax)?;
            let denominator = 10u128.pow(digits.len() as u32);
            nanos = nanos
                .checked_add(numerator * scale / denominator)
                .ok_or(CoerceError::OutOfRange)?;
        }

        total = total.checked_add(nanos).ok_or(CoerceError::OutOfRange)?;
    }

    if total > i64::MAX as u128 || (negative && total != 0) {
        return Err(CoerceError::OutOfRange);
    }

    Ok(Duration::from_nanos(total as u64))
}
