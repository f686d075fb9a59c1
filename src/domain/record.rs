// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record introspection.
//!
//! A [`Record`] is a struct whose leaf fields can be listed as
//! [`FieldDescriptor`]s. The list is flat: nested records are expanded at the
//! point where they occur and are never materialized themselves.
//!
//! Implementations are normally generated with `#[derive(Record)]`, but the
//! trait is simple enough to implement by hand.

use crate::domain::descriptor::FieldDescriptor;

/// A configuration record whose fields can be described.
///
/// # Examples
///
/// A handwritten implementation:
///
/// ```
/// use cfgbind::domain::descriptor::{FieldDescriptor, FieldSpec};
/// use cfgbind::domain::record::{extract, Record};
///
/// struct Server {
///     port: u16,
/// }
///
/// impl Record for Server {
///     fn describe<'a>(&'a mut self, prefix: &str, fields: &mut Vec<FieldDescriptor<'a>>) {
///         static PORT: FieldSpec = FieldSpec {
///             name: "port",
///             sources: &[("env", "SERVER_PORT")],
///             separator: ",",
///             layout: None,
///             default: Some("8080"),
///             description: None,
///             sensitive: false,
///         };
///         fields.push(FieldDescriptor::new(&PORT, prefix, &mut self.port));
///     }
/// }
///
/// let mut server = Server { port: 0 };
/// let fields = extract(&mut server);
/// assert_eq!(fields.len(), 1);
/// assert_eq!(fields[0].name(), "port");
/// ```
pub trait Record {
    /// Appends one descriptor per leaf field, in declaration order.
    ///
    /// `prefix` is the dotted path of this record inside its parent, empty at
    /// the root.
    fn describe<'a>(&'a mut self, prefix: &str, fields: &mut Vec<FieldDescriptor<'a>>);
}

/// Lists the leaf fields of `record`.
///
/// The same record type always yields descriptors in the same order.
pub fn extract<R: Record + ?Sized>(record: &mut R) -> Vec<FieldDescriptor<'_>> {
    let mut fields = Vec::new();
    record.describe("", &mut fields);
    fields
}
