// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration service implementation.
//!
//! This module provides the service that materializes a record from an ordered
//! list of readers, applies defaults, validates the result and keeps the record
//! up to date by re-running the whole pass on a fixed interval.

use crate::domain::{extract, ConfigError, ErrorList, Record};
use crate::ports::{Reader, Validator};
use crate::service::refresh::RefreshLoop;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Called with the outcome of every scheduled refresh.
pub type RefreshCallback = Arc<dyn Fn(&Outcome) + Send + Sync>;

/// The result of one materialization pass.
///
/// A pass can be valid and still carry errors: with several readers, some may
/// fail while the record as a whole is still acceptable. Validity is decided by
/// the validator alone, or is `true` when none is configured.
#[derive(Debug)]
pub struct Outcome {
    /// Whether the record was accepted
    pub valid: bool,
    /// Every error collected during the pass
    pub error: Option<ConfigError>,
}

impl Outcome {
    fn invalid(error: ConfigError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }

    /// Returns `true` if the record was accepted.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns `true` if the record was accepted without any error.
    pub fn is_clean(&self) -> bool {
        self.valid && self.error.is_none()
    }

    /// Converts the outcome into a `Result`, failing on any collected error.
    pub fn into_result(self) -> crate::domain::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(e) => write!(f, "valid={} error={}", self.valid, e),
            None => write!(f, "valid={}", self.valid),
        }
    }
}

/// Runs one materialization pass over `record`.
///
/// Readers run in order; a later reader's value for a field overrides an
/// earlier one. Defaults are applied to fields no reader supplied. Errors are
/// collected, never short-circuited.
pub fn read_and_validate<R: Record>(
    record: &mut R,
    readers: &[Box<dyn Reader>],
    validator: Option<&dyn Validator<R>>,
) -> Outcome {
    if readers.is_empty() {
        return Outcome::invalid(ConfigError::NoReaders);
    }

    let mut errors = ErrorList::new();
    {
        let mut fields = extract(record);

        for reader in readers {
            if let Err(e) = reader.read(&mut fields) {
                tracing::debug!("reader '{}' reported: {}", reader.name(), e);
                errors.push(e);
            }
        }

        for field in fields.iter_mut() {
            errors.collect(field.apply_default());
        }

        for field in &fields {
            tracing::debug!("{}", field);
        }
    }

    let mut valid = true;
    if let Some(validator) = validator {
        if let Err(e) = validator.validate(record) {
            valid = false;
            errors.push(ConfigError::ValidationError {
                message: e.to_string(),
                source: Some(e),
            });
        }
    }

    Outcome {
        valid,
        error: errors.into_error(),
    }
}

struct Running {
    refresh: Option<RefreshLoop>,
    readers: Arc<Vec<Box<dyn Reader>>>,
}

/// Materializes a record and keeps it fresh.
///
/// # Examples
///
/// ```rust
/// use cfgbind::prelude::*;
/// use std::collections::HashMap;
/// use std::sync::{Arc, RwLock};
/// use std::time::Duration;
///
/// #[derive(Debug, Default, Record)]
/// struct Settings {
///     #[config(env = "APP_WORKERS", default = "4")]
///     workers: u32,
/// }
///
/// let settings = Arc::new(RwLock::new(Settings::default()));
/// let service = ConfigService::builder()
///     .with_interval(Duration::from_secs(30))
///     .build();
///
/// let readers: Vec<Box<dyn Reader>> = vec![Box::new(EnvReader::with_values(HashMap::new()))];
/// let outcome = service.start(Arc::clone(&settings), None, readers);
/// assert!(outcome.is_clean());
/// assert_eq!(settings.read().unwrap().workers, 4);
///
/// service.stop();
/// ```
pub struct ConfigService<R> {
    /// Refresh interval; zero disables polling
    interval: Duration,
    /// Optional validator run after every pass
    validator: Option<Arc<dyn Validator<R>>>,
    /// Readers and refresh loop of the current `start`
    running: Mutex<Option<Running>>,
}

impl<R> ConfigService<R>
where
    R: Record + Send + Sync + 'static,
{
    /// Creates a service that never polls and has no validator.
    pub fn new() -> Self {
        Self {
            interval: Duration::ZERO,
            validator: None,
            running: Mutex::new(None),
        }
    }

    /// Creates a new configuration service builder.
    pub fn builder() -> ConfigServiceBuilder<R> {
        ConfigServiceBuilder::new()
    }

    /// Returns the refresh interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one pass over `record` with this service's validator.
    pub fn read_and_validate(&self, record: &mut R, readers: &[Box<dyn Reader>]) -> Outcome {
        read_and_validate(record, readers, self.validator.as_deref())
    }

    /// Materializes `record` and, if the result is valid, starts refreshing it.
    ///
    /// The first pass runs on the calling thread with the record's write lock
    /// held. Polling only starts when that pass is valid and the interval is
    /// not zero; every later pass reports through `callback`.
    ///
    /// Starting a service that is already running performs the pass but does
    /// not start a second loop. Readers that end up unused are stopped: those
    /// of a rejected first pass, those of a start while a loop is running,
    /// and those held by an earlier start without an interval.
    pub fn start(
        &self,
        record: Arc<RwLock<R>>,
        callback: Option<RefreshCallback>,
        readers: Vec<Box<dyn Reader>>,
    ) -> Outcome {
        let readers = Arc::new(readers);
        let outcome = {
            let mut guard = record.write().unwrap_or_else(PoisonError::into_inner);
            self.read_and_validate(&mut guard, &readers)
        };

        if !outcome.valid {
            stop_readers(&readers);
            return outcome;
        }

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().map_or(false, |r| r.refresh.is_some()) {
            tracing::warn!("configuration service is already running");
            stop_readers(&readers);
            return outcome;
        }
        // a previous start without an interval only holds its readers
        if let Some(previous) = running.take() {
            stop_readers(&previous.readers);
        }

        let refresh = if self.interval.is_zero() {
            None
        } else {
            let tick = refresh_tick(
                record,
                Arc::clone(&readers),
                self.validator.clone(),
                callback,
            );
            match RefreshLoop::spawn(self.interval, tick) {
                Ok(refresh) => {
                    tracing::info!("configuration refresh every {:?}", self.interval);
                    Some(refresh)
                }
                Err(e) => {
                    tracing::error!("failed to start configuration refresh: {}", e);
                    stop_readers(&readers);
                    return Outcome {
                        valid: outcome.valid,
                        error: merge(outcome.error, ConfigError::IoError(e)),
                    };
                }
            }
        };

        *running = Some(Running { refresh, readers });
        outcome
    }
}

impl<R> ConfigService<R> {
    /// Returns `true` if the refresh loop is running.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |running| running.refresh.is_some())
    }

    /// Stops the refresh loop and every reader.
    ///
    /// Blocks until the loop has exited. Stopping a service that is not
    /// running does nothing.
    pub fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(running) = running {
            if let Some(refresh) = running.refresh {
                refresh.stop();
            }
            stop_readers(&running.readers);
            tracing::debug!("configuration service stopped");
        }
    }
}

fn stop_readers(readers: &[Box<dyn Reader>]) {
    for reader in readers {
        reader.stop();
    }
}

fn refresh_tick<R>(
    record: Arc<RwLock<R>>,
    readers: Arc<Vec<Box<dyn Reader>>>,
    validator: Option<Arc<dyn Validator<R>>>,
    callback: Option<RefreshCallback>,
) -> impl FnMut() + Send + 'static
where
    R: Record + Send + Sync + 'static,
{
    move || {
        let outcome = {
            let mut guard = record.write().unwrap_or_else(PoisonError::into_inner);
            read_and_validate(&mut *guard, &readers, validator.as_deref())
        };
        if let Some(error) = &outcome.error {
            tracing::debug!("configuration refresh: {}", error);
        }
        if let Some(callback) = &callback {
            callback(&outcome);
        }
    }
}

fn merge(error: Option<ConfigError>, extra: ConfigError) -> Option<ConfigError> {
    let mut errors = ErrorList::new();
    if let Some(e) = error {
        errors.push(e);
    }
    errors.push(extra);
    errors.into_error()
}

impl<R> Default for ConfigService<R>
where
    R: Record + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Drop for ConfigService<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`ConfigService`].
///
/// # Examples
///
/// ```rust
/// use cfgbind::prelude::*;
/// use std::time::Duration;
///
/// #[derive(Record)]
/// struct Limits {
///     #[config(env = "MAX_CONNECTIONS", default = "64")]
///     max_connections: u32,
/// }
///
/// let service = ConfigService::<Limits>::builder()
///     .with_interval(Duration::from_secs(10))
///     .with_validator(|limits: &Limits| -> std::result::Result<(), BoxError> {
///         if limits.max_connections == 0 {
///             return Err("max_connections must be positive".into());
///         }
///         Ok(())
///     })
///     .build();
/// assert_eq!(service.interval(), Duration::from_secs(10));
/// ```
pub struct ConfigServiceBuilder<R> {
    interval: Duration,
    validator: Option<Arc<dyn Validator<R>>>,
}

impl<R> ConfigServiceBuilder<R>
where
    R: Record + Send + Sync + 'static,
{
    /// Creates a builder for a service that never polls.
    pub fn new() -> Self {
        Self {
            interval: Duration::ZERO,
            validator: None,
        }
    }

    /// Sets the refresh interval. A zero interval disables polling.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the validator run after every pass.
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Validator<R> + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Builds the service.
    pub fn build(self) -> ConfigService<R> {
        ConfigService {
            interval: self.interval,
            validator: self.validator,
            running: Mutex::new(None),
        }
    }
}

impl<R> Default for ConfigServiceBuilder<R>
where
    R: Record + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
