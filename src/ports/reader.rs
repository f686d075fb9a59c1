// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration reader trait definition.
//!
//! This module defines the `Reader` trait, the primary port for configuration
//! sources. A reader receives the flat list of field descriptors of a record and
//! fills every field it has an annotation for. Environment variables and the
//! secret store are the two built-in readers; any other source can be plugged in
//! by implementing this trait.

use crate::domain::{FieldDescriptor, Result};
use std::sync::Arc;

/// Rewrites a logical secret path before it is looked up.
///
/// Used by the secret store reader to substitute placeholders such as the
/// environment or service name into annotated paths.
pub type SecretPathFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A trait for configuration readers.
///
/// A reader is called once per materialization pass. It walks the descriptors,
/// picks the ones carrying an annotation for its [`name`](Reader::name), and
/// stores the coerced value through [`FieldDescriptor::set`].
///
/// # Error Handling
///
/// A reader must not stop at the first bad field. Per-field failures are
/// collected (see [`ErrorList`](crate::domain::ErrorList)) and returned together
/// once every descriptor has been visited, so one broken value never prevents its
/// siblings from being read.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the refresh scheduler calls
/// [`read`](Reader::read) from its background thread.
///
/// # Examples
///
/// ```rust
/// use cfgbind::domain::{ErrorList, FieldDescriptor, Result};
/// use cfgbind::ports::Reader;
/// use std::collections::HashMap;
///
/// struct StaticReader {
///     values: HashMap<String, String>,
/// }
///
/// impl Reader for StaticReader {
///     fn name(&self) -> &str {
///         "static"
///     }
///
///     fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()> {
///         let mut errors = ErrorList::new();
///         for field in fields.iter_mut() {
///             let Some(key) = field.source(self.name()) else {
///                 continue;
///             };
///             if let Some(raw) = self.values.get(key) {
///                 errors.collect(field.set(raw, self.name()));
///             }
///         }
///         errors.into_result()
///     }
/// }
/// ```
pub trait Reader: Send + Sync {
    /// Returns the provider name of this reader.
    ///
    /// The name doubles as the annotation key: a field annotated with
    /// `env = "PORT"` is read by the reader named `"env"`. It is also recorded
    /// as the field's provider after a successful read.
    fn name(&self) -> &str;

    /// Fills the annotated fields among `fields`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every annotated field was read or legitimately skipped
    /// * `Err(ConfigError)` - One or more fields failed; usually a
    ///   [`ConfigError::Multiple`](crate::domain::ConfigError::Multiple)
    fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()>;

    /// Releases resources owned by the reader.
    ///
    /// Called when the owning service stops. The default implementation does
    /// nothing.
    fn stop(&self) {}
}

impl<T: Reader + ?Sized> Reader for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()> {
        (**self).read(fields)
    }

    fn stop(&self) {
        (**self).stop()
    }
}

impl<T: Reader + ?Sized> Reader for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()> {
        (**self).read(fields)
    }

    fn stop(&self) {
        (**self).stop()
    }
}
