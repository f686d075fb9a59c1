// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated access to Vault's logical backend.

use crate::adapters::vault::client::VaultClient;
use crate::domain::{AuthError, ConfigError, Result};
use crate::ports::Authenticator;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A key/value object stored at one secret path.
pub type Secret = Map<String, Value>;

/// Reads and writes secrets, authenticating before every call.
///
/// For KV version 2 engines, set the data key to `"data"` so that the secret's
/// key/value pairs are unwrapped from the versioned envelope.
///
/// # Examples
///
/// ```rust
/// use cfgbind::adapters::vault::{TokenAuth, VaultClient, VaultConfig, VaultStorage};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), cfgbind::domain::AuthError> {
/// let client = VaultClient::new(&VaultConfig::new("http://127.0.0.1:8200"))?;
/// let auth = Arc::new(TokenAuth::new(client.clone(), "s.dev-token"));
/// let storage = VaultStorage::new(client, auth).with_data_key("data");
/// # Ok(())
/// # }
/// ```
pub struct VaultStorage {
    client: VaultClient,
    auth: Arc<dyn Authenticator>,
    data_key: Option<String>,
}

impl VaultStorage {
    /// Creates a storage over `client`, authenticated by `auth`.
    pub fn new(client: VaultClient, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            client,
            auth,
            data_key: None,
        }
    }

    /// Sets the key under which a secret's pairs are nested in its data.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    /// Returns the authenticator.
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.auth
    }

    fn token(&self) -> Result<String> {
        self.auth.authenticate()?;
        Ok(self.auth.token().ok_or(AuthError::EmptyClientToken)?)
    }

    /// Reads the secret at `path`.
    ///
    /// # Errors
    ///
    /// Authentication failures are returned as [`ConfigError::Auth`]. Request
    /// failures and responses without a data object are returned as
    /// [`ConfigError::SourceError`].
    pub fn read(&self, path: &str) -> Result<Secret> {
        let token = self.token()?;
        let body = self
            .client
            .read(&token, path)
            .map_err(|e| read_error(path, e))?;

        let data = data_object(body, path)?;
        match &self.data_key {
            None => Ok(data),
            Some(key) => match data.get(key) {
                Some(Value::Object(inner)) => Ok(inner.clone()),
                Some(_) => Err(ConfigError::source_error(
                    "vault",
                    format!("failed to cast to key-value pairs on {}", path),
                )),
                None => Err(ConfigError::source_error(
                    "vault",
                    format!("failed to get data on {} for {}", path, key),
                )),
            },
        }
    }

    /// Writes `data` to `path` and returns the data object of the response.
    ///
    /// Backends that answer without a body yield an empty object.
    pub fn write(&self, path: &str, data: &Secret) -> Result<Secret> {
        let token = self.token()?;
        let body = self
            .client
            .write(&token, path, &Value::Object(data.clone()))
            .map_err(|e| ConfigError::SourceError {
                source_name: "vault".to_string(),
                message: format!("failed to write {}", path),
                source: Some(Box::new(e)),
            })?;

        match body {
            Value::Null => Ok(Secret::new()),
            body => data_object(body, path),
        }
    }

    /// Stops the authenticator's renewal loop.
    pub fn stop(&self) {
        self.auth.stop()
    }
}

fn read_error(path: &str, e: AuthError) -> ConfigError {
    ConfigError::SourceError {
        source_name: "vault".to_string(),
        message: format!("failed to read {}", path),
        source: Some(Box::new(e)),
    }
}

fn data_object(body: Value, path: &str) -> Result<Secret> {
    match body {
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Object(data)) => Ok(data),
            _ => Err(ConfigError::source_error(
                "vault",
                format!("nil secret.Data on {}", path),
            )),
        },
        _ => Err(ConfigError::source_error(
            "vault",
            format!("nil secret on {}", path),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_object() {
        let data = data_object(json!({"data": {"user": "app"}}), "secret/app").unwrap();
        assert_eq!(data["user"], "app");
    }

    #[test]
    fn test_data_object_missing() {
        let err = data_object(json!({"warnings": null}), "secret/app").unwrap_err();
        assert!(err.to_string().contains("nil secret.Data on secret/app"));

        let err = data_object(Value::Null, "secret/app").unwrap_err();
        assert!(err.to_string().contains("nil secret on secret/app"));
    }
}
