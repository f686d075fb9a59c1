// SPDX-License-Identifier: MIT OR Apache-2.0

//! The coercion engine.
//!
//! This module turns raw strings into typed field values. Every supported field
//! type implements [`Coerce`]; a user type that implements it directly acts as a
//! custom setter and bypasses the builtin rules entirely. [`Slot`] erases the
//! field type so that descriptors can hold a mutable handle to any field.
//!
//! Sequences and maps are split on the field's separator and each token is
//! coerced recursively with the same separator and layout. Map items are split
//! on their first `:`.

use crate::domain::errors::CoerceError;
use crate::domain::literal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::path::PathBuf;
use std::time::Duration;

/// The separator used when a field does not declare one.
pub const DEFAULT_SEPARATOR: &str = ",";

/// Per-field parameters passed through every level of a coercion.
///
/// # Examples
///
/// ```
/// use cfgbind::domain::coerce::{Coerce, CoerceOptions};
///
/// let opts = CoerceOptions::default().with_separator("|");
/// let values = Vec::<u16>::coerce("1|2|3", &opts).unwrap();
/// assert_eq!(values, vec![1, 2, 3]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoerceOptions<'a> {
    /// Splits sequence elements and map items
    pub separator: &'a str,
    /// strftime layout for timestamps; RFC 3339 when absent
    pub layout: Option<&'a str>,
}

impl<'a> CoerceOptions<'a> {
    /// Returns a copy using `separator`.
    pub fn with_separator(self, separator: &'a str) -> Self {
        Self { separator, ..self }
    }

    /// Returns a copy using `layout`.
    pub fn with_layout(self, layout: &'a str) -> Self {
        Self {
            layout: Some(layout),
            ..self
        }
    }
}

impl Default for CoerceOptions<'_> {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            layout: None,
        }
    }
}

/// A type that can be built from a raw configuration string.
///
/// Implement this for your own types to take full control of how they are
/// parsed.
///
/// # Examples
///
/// ```
/// use cfgbind::domain::coerce::{Coerce, CoerceOptions};
/// use cfgbind::domain::errors::CoerceError;
///
/// #[derive(Debug, PartialEq)]
/// struct Level(u8);
///
/// impl Coerce for Level {
///     fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
///         match raw {
///             "low" => Ok(Level(1)),
///             "high" => Ok(Level(9)),
///             _ => Err(CoerceError::Custom("unknown level".to_string())),
///         }
///     }
/// }
///
/// let opts = CoerceOptions::default();
/// assert_eq!(Level::coerce("high", &opts).unwrap(), Level(9));
/// assert_eq!(
///     Vec::<Level>::coerce("low,high", &opts).unwrap(),
///     vec![Level(1), Level(9)]
/// );
/// ```
pub trait Coerce: Sized {
    /// Builds a value from `raw`.
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError>;

    /// Builds a sequence of values from `raw`.
    ///
    /// A blank input yields an empty sequence; otherwise `raw` is split on the
    /// separator and every token is coerced on its own.
    fn coerce_seq(raw: &str, opts: &CoerceOptions<'_>) -> Result<Vec<Self>, CoerceError> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        raw.split(opts.separator)
            .map(|token| Self::coerce(token, opts))
            .collect()
    }
}

/// A type-erased, mutable handle to a field's storage.
///
/// Every `Coerce + Debug + Send` type is a `Slot`. A failed assignment leaves
/// the field untouched.
pub trait Slot: Send {
    /// Coerces `raw` and stores the result in the field.
    fn assign(&mut self, raw: &str, opts: &CoerceOptions<'_>) -> Result<(), CoerceError>;

    /// Renders the current value for diagnostics.
    fn render(&self) -> String;

    /// Returns the name of the field's type.
    fn type_name(&self) -> &'static str;
}

impl<T> Slot for T
where
    T: Coerce + fmt::Debug + Send,
{
    fn assign(&mut self, raw: &str, opts: &CoerceOptions<'_>) -> Result<(), CoerceError> {
        *self = T::coerce(raw, opts)?;
        Ok(())
    }

    fn render(&self) -> String {
        format!("{:?}", self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl Coerce for bool {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        literal::parse_bool(raw)
    }
}

macro_rules! coerce_signed {
    ($($ty:ty),*) => {
        $(
            impl Coerce for $ty {
                fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
                    literal::parse_signed(raw)
                }
            }
        )*
    };
}

macro_rules! coerce_unsigned {
    ($($ty:ty),*) => {
        $(
            impl Coerce for $ty {
                fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
                    literal::parse_unsigned(raw)
                }
            }
        )*
    };
}

coerce_signed!(i8, i16, i32, i64, isize);
coerce_unsigned!(u16, u32, u64, usize);

impl Coerce for u8 {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        literal::parse_unsigned(raw)
    }

    /// Byte sequences take the raw string verbatim, without splitting.
    fn coerce_seq(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Vec<Self>, CoerceError> {
        Ok(raw.as_bytes().to_vec())
    }
}

impl Coerce for f32 {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        literal::parse_f32(raw)
    }
}

impl Coerce for f64 {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        literal::parse_f64(raw)
    }
}

impl Coerce for String {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        Ok(raw.to_string())
    }
}

impl Coerce for PathBuf {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        Ok(PathBuf::from(raw))
    }
}

impl Coerce for Duration {
    fn coerce(raw: &str, _opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        literal::parse_duration(raw)
    }
}

impl Coerce for DateTime<FixedOffset> {
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        match opts.layout {
            None => DateTime::parse_from_rfc3339(raw).map_err(|_| CoerceError::Layout {
                layout: "RFC 3339".to_string(),
            }),
            Some(layout) => parse_with_layout(raw, layout),
        }
    }
}

impl Coerce for DateTime<Utc> {
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        DateTime::<FixedOffset>::coerce(raw, opts).map(|t| t.with_timezone(&Utc))
    }
}

/// Parses a timestamp with a strftime layout.
///
/// Layouts carrying an offset keep it; layouts without one are read as UTC.
/// Layouts without a year resolve to year 0 and date-only layouts to midnight.
fn parse_with_layout(raw: &str, layout: &str) -> Result<DateTime<FixedOffset>, CoerceError> {
    if let Ok(t) = DateTime::parse_from_str(raw, layout) {
        return Ok(t);
    }

    let naive = NaiveDateTime::parse_from_str(raw, layout)
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&format!("0000 {}", raw), &format!("%Y {}", layout))
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, layout).map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| CoerceError::Layout {
            layout: layout.to_string(),
        })?;

    Ok(Utc.from_utc_datetime(&naive).into())
}

impl<T: Coerce> Coerce for Vec<T> {
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        T::coerce_seq(raw, opts)
    }
}

impl<T: Coerce> Coerce for Option<T> {
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        T::coerce(raw, opts).map(Some)
    }
}

/// Splits `raw` into coerced `(key, value)` pairs in input order.
fn coerce_pairs<K, V>(raw: &str, opts: &CoerceOptions<'_>) -> Result<Vec<(K, V)>, CoerceError>
where
    K: Coerce,
    V: Coerce,
{
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(opts.separator)
        .map(|item| {
            let (k, v) = item.split_once(':').ok_or(CoerceError::InvalidMapItem)?;
            Ok((K::coerce(k, opts)?, V::coerce(v, opts)?))
        })
        .collect()
}

impl<K, V, S> Coerce for HashMap<K, V, S>
where
    K: Coerce + Eq + Hash,
    V: Coerce,
    S: BuildHasher + Default,
{
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        // later duplicates overwrite earlier ones
        Ok(coerce_pairs(raw, opts)?.into_iter().collect())
    }
}

impl<K, V> Coerce for BTreeMap<K, V>
where
    K: Coerce + Ord,
    V: Coerce,
{
    fn coerce(raw: &str, opts: &CoerceOptions<'_>) -> Result<Self, CoerceError> {
        Ok(coerce_pairs(raw, opts)?.into_iter().collect())
    }
}
