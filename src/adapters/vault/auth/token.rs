// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static token authentication.

use super::session::{Credential, TokenSession};
use crate::adapters::vault::client::VaultClient;
use crate::domain::AuthError;
use crate::ports::Authenticator;

/// Authenticates with a token known up front.
///
/// The token is looked up to learn its lifetime, then renewed in the
/// background if it is renewable.
///
/// # Examples
///
/// ```rust
/// use cfgbind::adapters::vault::{TokenAuth, VaultClient, VaultConfig};
///
/// # fn main() -> Result<(), cfgbind::domain::AuthError> {
/// let client = VaultClient::new(&VaultConfig::new("http://127.0.0.1:8200"))?;
/// let auth = TokenAuth::new(client, "s.dev-token");
/// # Ok(())
/// # }
/// ```
pub struct TokenAuth {
    session: TokenSession,
    token: String,
}

impl TokenAuth {
    /// Creates an authenticator for `token`.
    pub fn new(client: VaultClient, token: impl Into<String>) -> Self {
        Self {
            session: TokenSession::new(client),
            token: token.into(),
        }
    }

    /// Returns the current credential.
    pub fn credential(&self) -> Option<Credential> {
        self.session.credential()
    }

    /// Returns `true` while the renewal loop runs.
    pub fn is_renewing(&self) -> bool {
        self.session.is_renewing()
    }
}

impl Authenticator for TokenAuth {
    fn authenticate(&self) -> Result<(), AuthError> {
        if self.session.needs_login() {
            self.session.establish(self.token.clone())?;
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
