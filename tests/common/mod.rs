// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities and mock implementations shared by the integration tests.

use cfgbind::domain::{ErrorList, FieldDescriptor, Result};
use cfgbind::ports::Reader;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per test binary.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A reader over an in-memory map that can be changed while a service runs.
///
/// Fields are looked up by their annotation for the reader's name.
#[derive(Debug, Clone)]
pub struct MockReader {
    name: String,
    values: Arc<Mutex<HashMap<String, String>>>,
    reads: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockReader {
    /// Creates an empty mock reader named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Arc::new(Mutex::new(HashMap::new())),
            reads: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adds a value to the mock reader.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Updates a value; visible to clones of this reader.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .lock()
            .unwrap()
            .insert(key.into(), value.into());
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }

    /// Returns how many passes this reader took part in.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Returns how many times the reader was stopped.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Boxes a clone sharing this reader's values and counters.
    pub fn boxed(&self) -> Box<dyn Reader> {
        Box::new(self.clone())
    }
}

impl Reader for MockReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let values = self.values.lock().unwrap().clone();

        let mut errors = ErrorList::new();
        for field in fields.iter_mut() {
            let Some(key) = field.source(&self.name) else {
                continue;
            };
            if let Some(raw) = values.get(key) {
                errors.collect(field.set(raw, &self.name));
            }
        }
        errors.into_result()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sets environment variables and removes them on drop.
#[allow(dead_code)]
pub struct EnvGuard {
    keys: Vec<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn new() -> Self {
        EnvGuard { keys: Vec::new() }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
        self.keys.push(key.to_string());
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            env::remove_var(key);
        }
    }
}
