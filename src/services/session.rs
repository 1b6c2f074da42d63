// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle manager.
//!
//! Owns the authentication state machine for one browsing context:
//!
//! ```text
//! Unauthenticated -> Authenticating -> { Authenticated, Failed }
//! Authenticated   -> Unauthenticated            (logout)
//! Failed          -> Authenticating             (new login)
//! ```
//!
//! Snapshots are published through a `watch` channel and replaced
//! wholesale. A failed login is reported to the caller as a `Failed`
//! snapshot while the published state reverts to `Unauthenticated`.

use crate::error::{AppError, Result};
use crate::models::{Principal, Session};
use crate::services::identity::{IdentityClient, IdentityProvider, LoginOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

type LoginSettlement = std::result::Result<(), String>;

/// Session manager for one browsing context.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    identity_provider_url: String,
    current: watch::Sender<Arc<Session>>,
    /// Held for the whole duration of a login.
    login_guard: tokio::sync::Mutex<()>,
    /// Bumped by every logout; a login only publishes if it is unchanged.
    epoch: AtomicU64,
    /// Serial handed to each fresh `Authenticated` snapshot.
    serial: AtomicU64,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, identity_provider_url: impl Into<String>) -> Self {
        let (current, _) = watch::channel(Arc::new(Session::unauthenticated()));
        Self {
            provider,
            identity_provider_url: identity_provider_url.into(),
            current,
            login_guard: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            serial: AtomicU64::new(0),
        }
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<Session> {
        self.current.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.current.subscribe()
    }

    /// Probe the identity provider for an existing session.
    ///
    /// Provider errors are treated as "no session".
    pub async fn init(&self) -> Arc<Session> {
        let _guard = self.login_guard.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let session = match self.probe().await {
            Ok(Some(principal)) => {
                let existing = self.current();
                if existing.identity() == Some(&principal) {
                    // Same person still signed in: keep the serial so
                    // dependants do not treat this as a fresh login.
                    return existing;
                }
                tracing::info!(principal = %principal, "Restored existing session");
                Session::authenticated(self.next_serial(), principal)
            }
            Ok(None) => Session::unauthenticated(),
            Err(e) => {
                tracing::debug!(error = %e, "Identity provider probe failed, treating as signed out");
                Session::unauthenticated()
            }
        };

        let session = Arc::new(session);
        self.publish_if_current(epoch, session.clone());
        self.current()
    }

    async fn probe(&self) -> Result<Option<Principal>> {
        let client = self.provider.create().await?;
        if !client.is_authenticated().await? {
            return Ok(None);
        }
        Ok(client.identity().and_then(|identity| identity.principal()))
    }

    /// Run the provider's login ceremony and settle it into one result.
    ///
    /// Returns `Err(LoginInProgress)` if another login has not settled yet.
    /// Otherwise returns the settled snapshot: `Authenticated`, or `Failed`
    /// with the published state reverted to `Unauthenticated`. Dropping the
    /// returned future mid-ceremony also reverts to `Unauthenticated`.
    pub async fn login(&self) -> Result<Arc<Session>> {
        let _guard = self
            .login_guard
            .try_lock()
            .map_err(|_| AppError::LoginInProgress)?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        self.publish_if_current(epoch, Arc::new(Session::authenticating()));
        let mut attempt = PendingLogin {
            manager: self,
            epoch,
            settled: false,
        };

        let outcome = self.run_login().await;
        attempt.settled = true;

        match outcome {
            Ok(principal) => {
                let session = Arc::new(Session::authenticated(self.next_serial(), principal));
                if self.publish_if_current(epoch, session.clone()) {
                    tracing::info!(
                        principal = session.principal_text().unwrap_or_default(),
                        "Login succeeded"
                    );
                    Ok(session)
                } else {
                    tracing::info!("Login settled after logout, discarding result");
                    Ok(Arc::new(Session::failed("session ended before login completed")))
                }
            }
            Err(e) => {
                let reason = match e {
                    AppError::IdentityProvider(reason) => reason,
                    other => other.to_string(),
                };
                tracing::warn!(reason = %reason, "Login failed");
                self.publish_if_current(epoch, Arc::new(Session::unauthenticated()));
                Ok(Arc::new(Session::failed(reason)))
            }
        }
    }

    async fn run_login(&self) -> Result<Principal> {
        let client: Arc<dyn IdentityClient> = self.provider.create().await?;

        let (tx, rx) = oneshot::channel::<LoginSettlement>();
        // Whichever callback fires first wins; the other finds the slot empty.
        let slot = Arc::new(Mutex::new(Some(tx)));
        let success_slot = slot.clone();

        client.login(LoginOptions::new(
            self.identity_provider_url.clone(),
            move || {
                if let Some(tx) = success_slot.lock().take() {
                    let _ = tx.send(Ok(()));
                }
            },
            move |reason| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(Err(reason));
                }
            },
        ));

        match rx.await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(AppError::IdentityProvider(reason)),
            Err(_) => {
                return Err(AppError::IdentityProvider(
                    "identity provider abandoned the login".to_string(),
                ))
            }
        }

        client
            .identity()
            .and_then(|identity| identity.principal())
            .ok_or_else(|| AppError::IdentityProvider("Invalid identity object".to_string()))
    }

    /// Log out at the provider, then reset locally no matter what.
    pub async fn logout(&self) -> Arc<Session> {
        self.epoch.fetch_add(1, Ordering::SeqCst);

        match self.provider.create().await {
            Ok(client) => {
                if let Err(e) = client.logout().await {
                    tracing::warn!(error = %e, "Identity provider logout failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Identity provider unavailable during logout"),
        }

        let session = Arc::new(Session::unauthenticated());
        self.current.send_replace(session.clone());
        tracing::info!("Logged out");
        session
    }

    fn next_serial(&self) -> u64 {
        self.serial.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `session` unless a logout happened since `epoch` was read.
    fn publish_if_current(&self, epoch: u64, session: Arc<Session>) -> bool {
        self.current.send_if_modified(|slot| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *slot = session;
            true
        })
    }
}

/// Reverts an abandoned `Authenticating` snapshot if the login future is
/// dropped before the ceremony settles.
struct PendingLogin<'a> {
    manager: &'a SessionManager,
    epoch: u64,
    settled: bool,
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Login dropped before settling");
            self.manager
                .publish_if_current(self.epoch, Arc::new(Session::unauthenticated()));
        }
    }
}
