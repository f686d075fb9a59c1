// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field descriptors.
//!
//! A [`FieldDescriptor`] pairs the static metadata of one leaf field (its
//! [`FieldSpec`]) with a mutable handle to the field's storage and a marker of
//! which provider last supplied its value. Descriptors are rebuilt on every
//! materialization pass; the specs are `static` and shared.

use crate::domain::coerce::{CoerceOptions, Slot};
use crate::domain::errors::{ConfigError, Result};
use std::fmt;

/// Replaces the value of sensitive fields in diagnostics.
pub const REDACTED: &str = "**********";

/// Static metadata of one field, as declared by its annotations.
///
/// `#[derive(Record)]` emits one `static FieldSpec` per field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// The field's name in its struct
    pub name: &'static str,
    /// `(provider, annotation)` pairs, e.g. `("env", "APP_PORT")`
    pub sources: &'static [(&'static str, &'static str)],
    /// Separator for sequence elements and map items
    pub separator: &'static str,
    /// Timestamp layout
    pub layout: Option<&'static str>,
    /// Literal applied when no reader supplies a value
    pub default: Option<&'static str>,
    /// Free-form description
    pub description: Option<&'static str>,
    /// Whether the value must be redacted in diagnostics
    pub sensitive: bool,
}

impl FieldSpec {
    /// Returns the non-empty annotation for `provider`, if any.
    pub fn source(&self, provider: &str) -> Option<&'static str> {
        self.sources
            .iter()
            .find(|(p, _)| *p == provider)
            .map(|(_, annotation)| *annotation)
            .filter(|annotation| !annotation.is_empty())
    }
}

/// Which source last supplied a field's value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    /// No value supplied yet in this pass
    Unset,
    /// Filled from the field's default literal
    Default,
    /// Supplied by the named reader
    Source(String),
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Unset => f.write_str("-"),
            Provider::Default => f.write_str("default"),
            Provider::Source(name) => f.write_str(name),
        }
    }
}

/// Joins a nested record prefix and a field name with a dot.
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Metadata and a mutable handle for one leaf field of a record.
pub struct FieldDescriptor<'a> {
    spec: &'static FieldSpec,
    name: String,
    target: &'a mut dyn Slot,
    provider: Provider,
}

impl<'a> FieldDescriptor<'a> {
    /// Creates a descriptor for a field nested under `prefix`.
    pub fn new(spec: &'static FieldSpec, prefix: &str, target: &'a mut dyn Slot) -> Self {
        Self {
            spec,
            name: join_path(prefix, spec.name),
            target,
            provider: Provider::Unset,
        }
    }

    /// Returns the dotted path of the field, e.g. `database.port`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field's static metadata.
    pub fn spec(&self) -> &'static FieldSpec {
        self.spec
    }

    /// Returns the field's annotation for `provider`, if it has a non-empty one.
    pub fn source(&self, provider: &str) -> Option<&'static str> {
        self.spec.source(provider)
    }

    /// Returns the field's default literal.
    pub fn default_value(&self) -> Option<&'static str> {
        self.spec.default
    }

    /// Returns the field's description.
    pub fn description(&self) -> Option<&'static str> {
        self.spec.description
    }

    /// Returns `true` if the value must never be logged.
    pub fn is_sensitive(&self) -> bool {
        self.spec.sensitive
    }

    /// Returns the provider that last supplied a value.
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Returns the name of the field's type.
    pub fn type_name(&self) -> &'static str {
        self.target.type_name()
    }

    /// Returns the coercion options declared on the field.
    pub fn options(&self) -> CoerceOptions<'static> {
        CoerceOptions {
            separator: self.spec.separator,
            layout: self.spec.layout,
        }
    }

    /// Coerces `raw` into the field and records `provider` as its source.
    ///
    /// On failure the field and its provider marker are left unchanged.
    pub fn set(&mut self, raw: &str, provider: &str) -> Result<()> {
        self.assign(raw)?;
        self.provider = Provider::Source(provider.to_string());
        Ok(())
    }

    /// Fills the field from its default literal if no reader supplied a value.
    ///
    /// Returns `Ok(true)` if the default was applied.
    pub fn apply_default(&mut self) -> Result<bool> {
        match (self.spec.default, &self.provider) {
            (Some(default), Provider::Unset) => {
                self.assign(default)?;
                self.provider = Provider::Default;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn assign(&mut self, raw: &str) -> Result<()> {
        let opts = self.options();
        self.target
            .assign(raw, &opts)
            .map_err(|e| ConfigError::conversion(self.name.as_str(), self.target.type_name(), e))
    }

    /// Renders the current value, redacted if the field is sensitive.
    pub fn render(&self) -> String {
        if self.spec.sensitive {
            REDACTED.to_string()
        } else {
            self.target.render()
        }
    }
}

impl fmt::Debug for FieldDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("value", &self.render())
            .field("provider", &self.provider)
            .finish()
    }
}

impl fmt::Display for FieldDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} [{}]", self.name, self.render(), self.provider)
    }
}
