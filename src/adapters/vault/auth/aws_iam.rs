// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS IAM authentication.

use super::session::{Credential, TokenSession};
use crate::adapters::vault::client::VaultClient;
use crate::domain::AuthError;
use crate::ports::{Authenticator, IamRequestSigner, SignedRequest};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;

/// Header binding a signed identity request to one Vault server
pub const SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

/// Default mount of the AWS auth method
pub const DEFAULT_MOUNT: &str = "aws";

/// Authenticates with a signed `GetCallerIdentity` request.
///
/// The request is produced by an [`IamRequestSigner`] holding the caller's AWS
/// credentials; Vault replays it to learn the caller's identity.
pub struct AwsIamAuth {
    session: TokenSession,
    signer: Arc<dyn IamRequestSigner>,
    role: String,
    mount: String,
    server_id: Option<String>,
}

impl AwsIamAuth {
    /// Creates an authenticator logging in as `role`.
    pub fn new(
        client: VaultClient,
        signer: Arc<dyn IamRequestSigner>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            session: TokenSession::new(client),
            signer,
            role: role.into(),
            mount: DEFAULT_MOUNT.to_string(),
            server_id: None,
        }
    }

    /// Sets the auth method mount.
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    /// Sets the server id signed into the identity request.
    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
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
        // fail on a bad mount before signing anything
        self.session.client().login_url(&self.mount)?;

        let signed = self
            .signer
            .sign(self.server_id.as_deref())
            .map_err(AuthError::Signing)?;
        let payload = login_payload(&signed, &self.role)?;

        tracing::debug!("vault: aws iam login as role {}", self.role);
        match &self.server_id {
            Some(id) => self.session.client().login_with_headers(
                &self.mount,
                &payload,
                &[(SERVER_ID_HEADER, id.as_str())],
            ),
            None => self.session.client().login(&self.mount, &payload),
        }
    }
}

/// Encodes a signed identity request as the login payload of the AWS method.
pub fn login_payload(signed: &SignedRequest, role: &str) -> Result<Value, AuthError> {
    let headers = serde_json::to_vec(&signed.headers)
        .map_err(|e| AuthError::Signing(Box::new(e)))?;

    Ok(serde_json::json!({
        "iam_http_request_method": signed.method,
        "iam_request_url": STANDARD.encode(signed.url.as_bytes()),
        "iam_request_headers": STANDARD.encode(headers),
        "iam_request_body": STANDARD.encode(&signed.body),
        "role": role,
    }))
}

impl Authenticator for AwsIamAuth {
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
