// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal blocking HTTP client for the Vault API.
//!
//! Only the handful of endpoints needed for reading secrets and managing a
//! token are covered: logical reads and writes, `auth/token/lookup-self`,
//! `auth/token/renew-self` and `auth/<mount>/login`.
//!
//! Every call blocks the calling thread, so the client can be used from the
//! renewal and refresh threads without an async runtime. Responses are read
//! leniently: lookups only need the lifetime fields, and logical reads return
//! the raw body for the caller to unwrap.

use crate::domain::AuthError;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Vault server.
///
/// # Examples
///
/// ```rust
/// use cfgbind::adapters::vault::VaultConfig;
/// use std::time::Duration;
///
/// let config = VaultConfig::new("https://vault.internal:8200")
///     .with_namespace("team-a")
///     .with_timeout(Duration::from_secs(3));
/// assert_eq!(config.address, "https://vault.internal:8200");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Base address, e.g. `https://vault:8200`
    pub address: String,
    /// Enterprise namespace sent with every request
    pub namespace: Option<String>,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl VaultConfig {
    /// Creates settings for `address` with the default timeout.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            namespace: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Token properties reported by `auth/token/lookup-self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Remaining time-to-live; zero for tokens that never expire
    pub ttl: Duration,
    /// Whether the token can be renewed
    pub renewable: bool,
    /// Absolute expiry, if the token has one
    pub expire_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize)]
struct LookupResponse {
    data: LookupData,
}

#[derive(Deserialize)]
struct LookupData {
    #[serde(default)]
    ttl: u64,
    #[serde(default)]
    renewable: bool,
    #[serde(default)]
    expire_time: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
    #[serde(default)]
    client_token: String,
}

/// A blocking Vault API client.
///
/// The client is stateless with respect to authentication: every call takes the
/// token to send. Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: Client,
    address: String,
    namespace: Option<String>,
}

impl VaultClient {
    /// Creates a client for the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptyAddress`] if the address is blank.
    pub fn new(config: &VaultConfig) -> Result<Self, AuthError> {
        let address = config.address.trim().trim_end_matches('/');
        if address.is_empty() {
            return Err(AuthError::EmptyAddress);
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Http(Box::new(e)))?;

        Ok(Self {
            http,
            address: address.to_string(),
            namespace: config.namespace.clone(),
        })
    }

    /// Returns the server address without a trailing slash.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    /// Returns the login URL of an auth method mounted at `mount`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EndpointMissing`] if the mount is blank.
    pub fn login_url(&self, mount: &str) -> Result<String, AuthError> {
        let mount = mount.trim().trim_matches('/');
        if mount.is_empty() {
            return Err(AuthError::EndpointMissing);
        }
        Ok(self.url(&format!("auth/{}/login", mount)))
    }

    fn send(&self, request: RequestBuilder, token: Option<&str>) -> Result<Value, AuthError> {
        let mut request = request;
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }

        let response = request.send().map_err(|e| AuthError::Http(Box::new(e)))?;
        let status = response.status();
        let body = response.text().map_err(|e| AuthError::Http(Box::new(e)))?;

        if !status.is_success() {
            tracing::debug!("vault answered {}: {}", status, body);
            return Err(AuthError::BadResponseStatus {
                status: status.as_u16(),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| AuthError::BadResponseBody(e.to_string()))
    }

    /// Reads the logical path `path` and returns the whole response body.
    pub fn read(&self, token: &str, path: &str) -> Result<Value, AuthError> {
        self.send(self.http.get(self.url(path)), Some(token))
    }

    /// Writes `data` to the logical path `path` and returns the response body.
    pub fn write(&self, token: &str, path: &str, data: &Value) -> Result<Value, AuthError> {
        self.send(self.http.post(self.url(path)).json(data), Some(token))
    }

    /// Looks up the properties of `token`.
    pub fn lookup_self(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let body = self.send(
            self.http.get(self.url("auth/token/lookup-self")),
            Some(token),
        )?;
        let lookup: LookupResponse =
            serde_json::from_value(body).map_err(|e| AuthError::BadResponseBody(e.to_string()))?;

        let expire_time = match lookup.data.expire_time.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                chrono::DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| AuthError::BadResponseBody(format!("expire_time: {}", e)))?
                    .with_timezone(&chrono::Utc),
            ),
        };

        Ok(TokenInfo {
            ttl: Duration::from_secs(lookup.data.ttl),
            renewable: lookup.data.renewable,
            expire_time,
        })
    }

    /// Extends the lease of `token` by `increment`.
    pub fn renew_self(&self, token: &str, increment: Duration) -> Result<(), AuthError> {
        let body = serde_json::json!({ "increment": format!("{}s", increment.as_secs()) });
        self.send(
            self.http.post(self.url("auth/token/renew-self")).json(&body),
            Some(token),
        )?;
        Ok(())
    }

    /// Logs in through the auth method mounted at `mount` and returns the
    /// client token.
    pub fn login(&self, mount: &str, payload: &Value) -> Result<String, AuthError> {
        self.login_with_headers(mount, payload, &[])
    }

    /// Like [`login`](Self::login), adding extra request headers.
    pub fn login_with_headers(
        &self,
        mount: &str,
        payload: &Value,
        headers: &[(&str, &str)],
    ) -> Result<String, AuthError> {
        let mut request = self.http.post(self.login_url(mount)?).json(payload);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let body = self.send(request, None)?;
        let login: LoginResponse =
            serde_json::from_value(body).map_err(|e| AuthError::BadResponseBody(e.to_string()))?;

        match login.auth {
            Some(auth) if !auth.client_token.is_empty() => Ok(auth.client_token),
            _ => Err(AuthError::EmptyClientToken),
        }
    }
}
