// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record validator trait definition.

use crate::domain::BoxError;

/// Validates a fully materialized record.
///
/// The validator runs after every reader and the default pass. A rejection marks
/// the pass as invalid but never rolls back the values already written.
///
/// Any `Fn(&R) -> Result<(), BoxError>` closure is a validator.
///
/// # Examples
///
/// ```rust
/// use cfgbind::ports::Validator;
///
/// struct Limits {
///     workers: u32,
/// }
///
/// let validator = |limits: &Limits| -> Result<(), cfgbind::domain::BoxError> {
///     if limits.workers == 0 {
///         return Err("workers must be positive".into());
///     }
///     Ok(())
/// };
///
/// assert!(validator.validate(&Limits { workers: 4 }).is_ok());
/// assert!(validator.validate(&Limits { workers: 0 }).is_err());
/// ```
pub trait Validator<R>: Send + Sync {
    /// Accepts or rejects `record`.
    fn validate(&self, record: &R) -> Result<(), BoxError>;
}

impl<R, F> Validator<R> for F
where
    F: Fn(&R) -> Result<(), BoxError> + Send + Sync,
{
    fn validate(&self, record: &R) -> Result<(), BoxError> {
        self(record)
    }
}
