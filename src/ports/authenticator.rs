// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret store authentication trait definitions.
//!
//! An [`Authenticator`] owns the credential used to talk to the secret store:
//! it logs in on demand, keeps the token alive in the background and hands the
//! current token to whoever issues requests.

use crate::domain::{AuthError, BoxError};
use std::collections::BTreeMap;

/// Obtains and keeps alive a secret store token.
///
/// # Lifecycle
///
/// [`authenticate`](Authenticator::authenticate) is called before every batch of
/// requests. It performs the login exchange only when no credential is held or
/// the held one has expired, then arms a background renewal loop. Calling it
/// again while a valid credential is held is cheap and does nothing.
///
/// [`stop`](Authenticator::stop) ends the renewal loop. It is safe to call when
/// no loop is running, and more than once.
pub trait Authenticator: Send + Sync {
    /// Ensures a valid token is held, logging in if needed.
    fn authenticate(&self) -> Result<(), AuthError>;

    /// Returns the current token, if authenticated.
    fn token(&self) -> Option<String>;

    /// Stops the renewal loop.
    fn stop(&self);
}

/// A signed cloud identity request, as produced by an [`IamRequestSigner`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignedRequest {
    /// HTTP method of the signed request, usually `POST`
    pub method: String,
    /// Full URL of the signed request
    pub url: String,
    /// Signed headers, each with all of its values
    pub headers: BTreeMap<String, Vec<String>>,
    /// Request body
    pub body: Vec<u8>,
}

/// Signs a cloud identity (`GetCallerIdentity`) request.
///
/// The secret store verifies cloud identities by replaying a request signed
/// with the caller's cloud credentials. Signing is left to the caller so that
/// no particular cloud SDK is imposed.
pub trait IamRequestSigner: Send + Sync {
    /// Builds and signs a caller identity request.
    ///
    /// When `server_id` is set, it must be added as the
    /// `X-Vault-AWS-IAM-Server-ID` header before signing.
    fn sign(&self, server_id: Option<&str>) -> Result<SignedRequest, BoxError>;
}
