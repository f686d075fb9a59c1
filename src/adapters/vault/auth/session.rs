// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token session shared by every authentication method.
//!
//! A session holds the current credential and runs the renewal loop. Auth
//! methods only differ in how they obtain the initial token; once they have
//! one, they hand it to [`TokenSession::establish`].

use crate::adapters::vault::client::{TokenInfo, VaultClient};
use crate::domain::AuthError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A secret store token and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// The token
    pub token: String,
    /// When the token was obtained or last renewed
    pub acquired_at: DateTime<Utc>,
    /// Time-to-live at acquisition; zero if the token never expires
    pub ttl: Duration,
    /// Whether the token can be renewed
    pub renewable: bool,
    /// Absolute expiry reported by the server
    pub expire_time: Option<DateTime<Utc>>,
}

impl Credential {
    fn new(token: String, info: TokenInfo) -> Self {
        Self {
            token,
            acquired_at: Utc::now(),
            ttl: info.ttl,
            renewable: info.renewable,
            expire_time: info.expire_time,
        }
    }

    /// Returns `true` if the credential is no longer valid at `now`.
    ///
    /// An explicit expiry wins over the time-to-live. A zero time-to-live
    /// never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(expire_time) = self.expire_time {
            return now >= expire_time;
        }
        if self.ttl.is_zero() {
            return false;
        }
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now >= self.acquired_at + ttl,
            Err(_) => false,
        }
    }

    /// Returns `true` if the credential is no longer valid.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Returns how long to wait before renewing a token with the given TTL.
pub fn renewal_delay(ttl: Duration) -> Duration {
    ttl / 10
}

struct SessionState {
    client: VaultClient,
    credential: RwLock<Option<Credential>>,
    renewing: AtomicBool,
}

impl SessionState {
    fn current_token(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.token.clone())
    }

    /// Renews the token and returns its new TTL.
    fn renew(&self, ttl: Duration) -> Result<Duration, AuthError> {
        let token = self.current_token().ok_or(AuthError::EmptyClientToken)?;
        self.client.renew_self(&token, ttl)?;
        let info = self.client.lookup_self(&token)?;
        if info.ttl.is_zero() {
            return Err(AuthError::InvalidTokenTtl);
        }
        let next = info.ttl;
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Credential::new(token, info));
        Ok(next)
    }
}

struct Renewal {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// The credential and renewal loop of one authenticator.
pub struct TokenSession {
    state: Arc<SessionState>,
    renewal: Mutex<Option<Renewal>>,
}

impl TokenSession {
    /// Creates an unauthenticated session.
    pub fn new(client: VaultClient) -> Self {
        Self {
            state: Arc::new(SessionState {
                client,
                credential: RwLock::new(None),
                renewing: AtomicBool::new(false),
            }),
            renewal: Mutex::new(None),
        }
    }

    /// Returns the client used for lookups and renewals.
    pub fn client(&self) -> &VaultClient {
        &self.state.client
    }

    /// Returns `true` if no credential is held or the held one has expired.
    pub fn needs_login(&self) -> bool {
        match &*self
            .state
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(credential) => credential.is_expired(),
            None => true,
        }
    }

    /// Returns the current token.
    pub fn token(&self) -> Option<String> {
        self.state.current_token()
    }

    /// Returns a copy of the current credential.
    pub fn credential(&self) -> Option<Credential> {
        self.state
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` while the renewal loop runs.
    pub fn is_renewing(&self) -> bool {
        self.state.renewing.load(Ordering::SeqCst)
    }

    /// Adopts `token` after looking it up, then arms the renewal loop.
    ///
    /// Non-renewable tokens are kept without a renewal loop. A renewable
    /// token with a zero TTL is rejected.
    pub fn establish(&self, token: String) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyClientToken);
        }
        let info = self.state.client.lookup_self(&token)?;
        if info.renewable && info.ttl.is_zero() {
            return Err(AuthError::InvalidTokenTtl);
        }

        let credential = Credential::new(token, info);
        let (renewable, ttl) = (credential.renewable, credential.ttl);
        *self
            .state
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential);
        tracing::debug!(
            "vault token acquired (ttl {:?}, renewable {})",
            ttl,
            renewable
        );

        if renewable {
            self.arm(ttl)?;
        }
        Ok(())
    }

    fn arm(&self, ttl: Duration) -> Result<(), AuthError> {
        if self
            .state
            .renewing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let mut renewal = self.renewal.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(finished) = renewal.take() {
            let _ = finished.thread.join();
        }

        let (stop_tx, stop_rx) = channel();
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name("vault-token-renewal".to_string())
            .spawn(move || {
                renewal_loop(&state, ttl, stop_rx);
                state.renewing.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(thread) => {
                *renewal = Some(Renewal { stop_tx, thread });
                Ok(())
            }
            Err(e) => {
                self.state.renewing.store(false, Ordering::SeqCst);
                Err(AuthError::Io(e))
            }
        }
    }

    /// Stops the renewal loop and waits for it to exit.
    pub fn stop(&self) {
        let renewal = self
            .renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(renewal) = renewal {
            let _ = renewal.stop_tx.send(());
            if renewal.thread.join().is_err() {
                tracing::warn!("vault token renewal thread panicked");
            }
        }
    }
}

impl Drop for TokenSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn renewal_loop(state: &SessionState, ttl: Duration, stop_rx: Receiver<()>) {
    let mut ttl = ttl;
    loop {
        match stop_rx.recv_timeout(renewal_delay(ttl)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("vault token renewal stopped");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        match state.renew(ttl) {
            Ok(next) => {
                tracing::info!("Vault token has been refreshed");
                ttl = next;
            }
            Err(e) => {
                tracing::error!("Vault token renewal failed: {}", e);
                return;
            }
        }
    }
}
