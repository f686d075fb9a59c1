// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration crate.
//!
//! This module defines the errors that can occur while materializing a record:
//! field-level coercion failures, missing or malformed source annotations,
//! secret store and authentication failures, and the aggregate that collects
//! them so that one bad field never stops its siblings from being read.

use std::fmt;
use thiserror::Error;

/// A boxed error returned by external collaborators (validators, signers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for configuration operations.
///
/// It is marked as `#[non_exhaustive]` to allow for future additions without
/// breaking backwards compatibility.
///
/// # Examples
///
/// ```
/// use cfgbind::domain::errors::ConfigError;
///
/// let error = ConfigError::MissingValue {
///     provider: "env".to_string(),
///     key: "DATABASE_HOST".to_string(),
/// };
/// assert_eq!(error.to_string(), "env: DATABASE_HOST is not set");
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A raw value could not be converted to the type of its field.
    #[error(
        "Failed to convert configuration value for key '{key}' to type {target_type}: {source}"
    )]
    TypeConversionError {
        /// The field being converted
        key: String,
        /// The target type name
        target_type: String,
        /// The underlying conversion error
        source: CoerceError,
    },

    /// A required source has no value and the field declares no default.
    #[error("{provider}: {key} is not set")]
    MissingValue {
        /// The reader that looked the value up
        provider: String,
        /// The source key (environment variable, secret path, ...)
        key: String,
    },

    /// A source annotation could not be interpreted.
    #[error("{provider}: annotation '{annotation}' on field '{field}' is malformed")]
    MalformedAnnotation {
        /// The reader owning the annotation
        provider: String,
        /// The field carrying the annotation
        field: String,
        /// The raw annotation
        annotation: String,
    },

    /// A materialization pass was requested without any reader.
    #[error("no config readers found")]
    NoReaders,

    /// An error occurred in a configuration source.
    #[error("Configuration source '{source_name}' error: {message}")]
    SourceError {
        /// The name of the source that encountered the error
        source_name: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The external validator rejected the record.
    #[error("Configuration is invalid: {message}")]
    ValidationError {
        /// The error message
        message: String,
        /// The validator's error
        #[source]
        source: Option<BoxError>,
    },

    /// Authentication against the secret store failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Several errors collected during one pass.
    #[error(transparent)]
    Multiple(ErrorList),

    /// An I/O error occurred while reading configuration.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    /// Wraps a coercion failure with the field and type it happened on.
    pub fn conversion(key: impl Into<String>, target_type: &str, source: CoerceError) -> Self {
        ConfigError::TypeConversionError {
            key: key.into(),
            target_type: target_type.to_string(),
            source,
        }
    }

    /// Creates a `SourceError` without an underlying cause.
    pub fn source_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::SourceError {
            source_name: source_name.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Errors raised by the coercion engine.
///
/// None of the variants carry the raw input: a field may be sensitive and its
/// value must never end up in a log line through an error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CoerceError {
    /// The input is not a literal of the target type.
    #[error("invalid syntax")]
    Syntax,

    /// The input is a literal of the target type that does not fit its width.
    #[error("value out of range")]
    OutOfRange,

    /// A map item without a `key:value` shape.
    #[error("invalid map item")]
    InvalidMapItem,

    /// A timestamp that does not match its layout.
    #[error("does not match layout {layout}")]
    Layout {
        /// The layout the input was parsed with
        layout: String,
    },

    /// A rejection reported by a custom `Coerce` implementation.
    #[error("{0}")]
    Custom(String),
}

/// Errors raised while authenticating against, or renewing a token with, the
/// secret store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The secret store address is empty.
    #[error("empty address for vault api")]
    EmptyAddress,

    /// The login mount is empty.
    #[error("empty auth endpoint")]
    EndpointMissing,

    /// The secret store answered with a non-success status.
    #[error("bad response status code {status}")]
    BadResponseStatus {
        /// The HTTP status code
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("bad response body: {0}")]
    BadResponseBody(String),

    /// The login response carried no client token.
    #[error("empty auth.client_token property in response body")]
    EmptyClientToken,

    /// The token has a zero or unreadable time-to-live.
    #[error("invalid token TTL")]
    InvalidTokenTtl,

    /// The request could not be sent or its response could not be read.
    #[error("vault request failed: {0}")]
    Http(#[source] BoxError),

    /// The identity document could not be read.
    #[error("failed to read identity token: {0}")]
    Io(#[from] std::io::Error),

    /// The cloud identity request could not be signed.
    #[error("failed to sign identity request: {0}")]
    Signing(#[source] BoxError),
}

/// A collection of errors gathered without interrupting a pass.
///
/// Pushing an `ErrorList` (or a `ConfigError::Multiple`) into another list
/// flattens it, so the aggregate is always one level deep.
///
/// # Examples
///
/// ```
/// use cfgbind::domain::errors::{ConfigError, ErrorList};
///
/// let mut errors = ErrorList::new();
/// errors.push(ConfigError::NoReaders);
/// errors.push(ConfigError::source_error("vault", "sealed"));
///
/// assert_eq!(errors.len(), 2);
/// assert!(errors.to_string().starts_with("2 errors occurred: "));
/// ```
#[derive(Debug, Default)]
pub struct ErrorList(Vec<ConfigError>);

impl ErrorList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an error, flattening nested aggregates.
    pub fn push(&mut self, error: ConfigError) {
        match error {
            ConfigError::Multiple(list) => self.0.extend(list.0),
            other => self.0.push(other),
        }
    }

    /// Appends the error of a failed result, if any.
    pub fn collect<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    /// Returns the number of collected errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the collected errors.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.0.iter()
    }

    /// Converts the list into a single error, or `None` if it is empty.
    pub fn into_error(self) -> Option<ConfigError> {
        if self.0.is_empty() {
            None
        } else {
            Some(ConfigError::Multiple(self))
        }
    }

    /// Converts the list into `Ok(())` if empty, an error otherwise.
    pub fn into_result(self) -> Result<()> {
        match self.into_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.0.len() == 1 { "error" } else { "errors" };
        write!(f, "{} {} occurred: ", self.0.len(), noun)?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

impl IntoIterator for ErrorList {
    type Item = ConfigError;
    type IntoIter = std::vec::IntoIter<ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
