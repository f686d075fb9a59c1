// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable configuration reader.
//!
//! This module provides a reader that fills record fields from environment
//! variables named by their `env` annotation.

use crate::domain::{ConfigError, ErrorList, FieldDescriptor, Result};
use crate::ports::Reader;
use std::collections::HashMap;
use std::env;

/// Maximum length for environment variable values (prevents DoS)
const MAX_ENV_VALUE_LEN: usize = 1048576; // 1MB

/// Configuration reader for environment variables.
///
/// For every field annotated with `env = "NAME"`, the reader looks `NAME` up in
/// the process environment and coerces the value into the field. A missing
/// variable is reported as [`ConfigError::MissingValue`] unless the field has a
/// default, in which case it is left for the default pass. In verbose mode,
/// missing variables are reported even when a default exists.
///
/// # Examples
///
/// ```rust
/// use cfgbind::adapters::EnvReader;
/// use cfgbind::ports::Reader;
///
/// // Read variables exactly as annotated
/// let reader = EnvReader::new();
/// assert_eq!(reader.name(), "env");
///
/// // Prepend a prefix to every annotated name
/// let reader = EnvReader::new().with_prefix("MYAPP_").verbose(true);
/// ```
#[derive(Debug, Clone)]
pub struct EnvReader {
    /// Annotation key and provider name
    tag: String,
    /// Optional prefix prepended to every variable name
    prefix: Option<String>,
    /// Report missing variables even when the field has a default
    verbose: bool,
    /// Fixed values used instead of the process environment
    values: Option<HashMap<String, String>>,
}

impl EnvReader {
    /// Creates a reader over the process environment.
    pub fn new() -> Self {
        Self {
            tag: "env".to_string(),
            prefix: None,
            verbose: false,
            values: None,
        }
    }

    /// Creates a reader with pre-populated values for testing.
    ///
    /// **Note**: This method is primarily intended for testing. The process
    /// environment is never consulted by a reader built this way.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cfgbind::adapters::EnvReader;
    /// use std::collections::HashMap;
    ///
    /// let mut values = HashMap::new();
    /// values.insert("APP_PORT".to_string(), "8080".to_string());
    ///
    /// let reader = EnvReader::with_values(values);
    /// ```
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self {
            values: Some(values),
            ..Self::new()
        }
    }

    /// Sets a prefix prepended to every annotated variable name.
    ///
    /// With prefix `APP_`, a field annotated `env = "PORT"` reads `APP_PORT`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Reads annotations under a different key than `env`.
    ///
    /// The tag is also the provider name recorded on the fields it fills.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Sets whether missing variables are reported even when a default exists.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    fn variable_name(&self, annotation: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, annotation),
            None => annotation.to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let value = match &self.values {
            Some(values) => values.get(name).cloned(),
            None => match env::var(name) {
                Ok(value) => Some(value),
                Err(env::VarError::NotPresent) => None,
                Err(e @ env::VarError::NotUnicode(_)) => {
                    return Err(ConfigError::SourceError {
                        source_name: self.tag.clone(),
                        message: format!("{} is not valid unicode", name),
                        source: Some(Box::new(e)),
                    })
                }
            },
        };

        match value {
            Some(value) if value.len() > MAX_ENV_VALUE_LEN => Err(ConfigError::source_error(
                self.tag.as_str(),
                format!(
                    "{} is too long: {} bytes (max {})",
                    name,
                    value.len(),
                    MAX_ENV_VALUE_LEN
                ),
            )),
            other => Ok(other),
        }
    }
}

impl Default for EnvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for EnvReader {
    fn name(&self) -> &str {
        &self.tag
    }

    fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()> {
        let mut errors = ErrorList::new();

        for field in fields.iter_mut() {
            let Some(annotation) = field.source(&self.tag) else {
                continue;
            };
            let name = self.variable_name(annotation);
            tracing::debug!("{}: reading {}", self.tag, name);

            let raw = match self.lookup(&name) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    if field.default_value().is_none() || self.verbose {
                        errors.push(ConfigError::MissingValue {
                            provider: self.tag.clone(),
                            key: name,
                        });
                    }
                    continue;
                }
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };

            if errors.collect(field.set(&raw, &self.tag)).is_some() {
                tracing::debug!("{}: {} = {}", self.tag, field.name(), field.render());
            }
        }

        errors.into_result()
    }
}
