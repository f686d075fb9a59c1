// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kubernetes service account authentication.

use super::session::{Credential, TokenSession};
use crate::adapters::vault::client::VaultClient;
use crate::domain::AuthError;
use crate::ports::Authenticator;
use std::fs;
use std::path::PathBuf;

/// Where the kubelet mounts the service account token
pub const DEFAULT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default mount of the Kubernetes auth method
pub const DEFAULT_MOUNT: &str = "kubernetes";

/// Authenticates with the pod's service account token.
///
/// On login the token file is read and exchanged for a Vault token at
/// `auth/<mount>/login` with the configured role.
///
/// # Examples
///
/// ```rust
/// use cfgbind::adapters::vault::{KubernetesAuth, VaultClient, VaultConfig};
///
/// # fn main() -> Result<(), cfgbind::domain::AuthError> {
/// let client = VaultClient::new(&VaultConfig::new("http://vault:8200"))?;
/// let auth = KubernetesAuth::new(client, "billing")
///     .with_mount("k8s-prod")
///     .with_jwt_path("/tmp/token");
/// # Ok(())
/// # }
/// ```
pub struct KubernetesAuth {
    session: TokenSession,
    role: String,
    mount: String,
    jwt_path: PathBuf,
}

impl KubernetesAuth {
    /// Creates an authenticator logging in as `role`.
    pub fn new(client: VaultClient, role: impl Into<String>) -> Self {
        Self {
            session: TokenSession::new(client),
            role: role.into(),
            mount: DEFAULT_MOUNT.to_string(),
            jwt_path: PathBuf::from(DEFAULT_JWT_PATH),
        }
    }

    /// Sets the auth method mount.
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    /// Sets the path of the service account token.
    pub fn with_jwt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.jwt_path = path.into();
        self
    }

    /// Returns the current credential.
    pub fn credential(&self) -> Option<Credential> {
        self.session.credential()
    }

    /// Returns `true` while the renewal loop runs.
    pub fn is_renewing(&self) -> bool {
        self.session.is_renewing()
    }

    fn login(&self) -> Result<String, AuthError> {
        let jwt = fs::read_to_string(&self.jwt_path)?;
        let payload = serde_json::json!({
            "role": self.role,
            "jwt": jwt.trim(),
        });
        tracing::debug!("vault: kubernetes login as role {}", self.role);
        self.session.client().login(&self.mount, &payload)
    }
}

impl Authenticator for KubernetesAuth {
    fn authenticate(&self) -> Result<(), AuthError> {
        if self.session.needs_login() {
            let token = self.login()?;
            self.session.establish(token)?;
        }
        Ok(())
    }

    fn token(&self) -> Option<String> {
        self.session.token()
    }

    fn stop(&self) {
        self.session.stop()
    }
}
