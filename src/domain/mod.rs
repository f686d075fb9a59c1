// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core types and logic.
//!
//! This module holds the record model (field descriptors and the [`Record`]
//! trait), the coercion engine that turns raw text into typed field values, and
//! the error types shared by every other layer. It is independent of any
//! concrete configuration source.

pub mod coerce;
pub mod descriptor;
pub mod errors;
pub(crate) mod literal;
pub mod record;

// Re-export commonly used types
pub use coerce::{Coerce, CoerceOptions, Slot};
pub use descriptor::{join_path, FieldDescriptor, FieldSpec, Provider};
pub use errors::{AuthError, BoxError, CoerceError, ConfigError, ErrorList, Result};
pub use record::{extract, Record};
