// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault configuration reader.

use crate::adapters::vault::storage::{Secret, VaultStorage};
use crate::domain::{ConfigError, ErrorList, FieldDescriptor, Result};
use crate::ports::{Reader, SecretPathFormatter};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration reader for secrets stored in Vault.
///
/// Fields are annotated with `vault = "path:key"`. The path is passed through
/// the optional [`SecretPathFormatter`] before lookup. Every path is fetched at
/// most once per pass, however many fields refer to it; a failed fetch is
/// reported for every field of that path without being retried.
///
/// # Examples
///
/// ```rust
/// use cfgbind::adapters::vault::{TokenAuth, VaultClient, VaultConfig, VaultReader, VaultStorage};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), cfgbind::domain::AuthError> {
/// let client = VaultClient::new(&VaultConfig::new("http://127.0.0.1:8200"))?;
/// let auth = Arc::new(TokenAuth::new(client.clone(), "s.dev-token"));
/// let storage = Arc::new(VaultStorage::new(client, auth).with_data_key("data"));
///
/// let reader = VaultReader::new(storage)
///     .with_formatter(Arc::new(|path: &str| path.replace("{env}", "prod")));
/// # Ok(())
/// # }
/// ```
pub struct VaultReader {
    storage: Arc<VaultStorage>,
    formatter: Option<SecretPathFormatter>,
    tag: String,
}

impl VaultReader {
    /// Creates a reader over `storage`.
    pub fn new(storage: Arc<VaultStorage>) -> Self {
        Self {
            storage,
            formatter: None,
            tag: "vault".to_string(),
        }
    }

    /// Sets the formatter applied to every secret path.
    pub fn with_formatter(mut self, formatter: SecretPathFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Reads annotations under a different key than `vault`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    fn resolve(&self, path: &str) -> String {
        match &self.formatter {
            Some(formatter) => formatter(path),
            None => path.to_string(),
        }
    }

    fn lookup(
        &self,
        secrets: &mut HashMap<String, std::result::Result<Secret, Arc<ConfigError>>>,
        path: &str,
        key: &str,
    ) -> Result<String> {
        let secret = secrets
            .entry(path.to_string())
            .or_insert_with(|| self.storage.read(path).map_err(Arc::new));

        let secret = match secret {
            Ok(secret) => secret,
            Err(e) => {
                return Err(ConfigError::SourceError {
                    source_name: self.tag.clone(),
                    message: format!("failed to read {}", path),
                    source: Some(Box::new(Arc::clone(e))),
                })
            }
        };

        match secret.get(key) {
            None | Some(Value::Null) => Err(ConfigError::MissingValue {
                provider: self.tag.clone(),
                key: format!("{}:{}", path, key),
            }),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(_) => Err(ConfigError::source_error(
                self.tag.as_str(),
                format!("{}:{} is not a scalar value", path, key),
            )),
        }
    }
}

impl Reader for VaultReader {
    fn name(&self) -> &str {
        &self.tag
    }

    fn read(&self, fields: &mut [FieldDescriptor<'_>]) -> Result<()> {
        let mut errors = ErrorList::new();
        let mut secrets = HashMap::new();

        for field in fields.iter_mut() {
            let Some(annotation) = field.source(&self.tag) else {
                continue;
            };

            let parts: Vec<&str> = annotation.split(':').collect();
            let [path, key] = parts[..] else {
                errors.push(ConfigError::MalformedAnnotation {
                    provider: self.tag.clone(),
                    field: field.name().to_string(),
                    annotation: annotation.to_string(),
                });
                continue;
            };

            let path = self.resolve(path);
            tracing::debug!("{}: reading {}:{}", self.tag, path, key);

            let Some(raw) = errors.collect(self.lookup(&mut secrets, &path, key)) else {
                continue;
            };
            if errors.collect(field.set(&raw, &self.tag)).is_some() {
                tracing::debug!("{}: {} = {}", self.tag, field.name(), field.render());
            }
        }

        errors.into_result()
    }

    fn stop(&self) {
        self.storage.stop()
    }
}
