// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration gate: does the signed-in person have a backend profile?
//!
//! The lookup fails open. If the backend cannot be reached the person is
//! routed to registration, where the registration call itself will report
//! the outage.

use crate::error::{AppError, Result};
use crate::models::{RegistrationStatus, Route, Session};
use crate::services::backend::BackendConnector;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Registration status plus the routing decision derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationDecision {
    #[serde(flatten)]
    pub status: RegistrationStatus,
    pub route: Route,
}

impl From<RegistrationStatus> for RegistrationDecision {
    fn from(status: RegistrationStatus) -> Self {
        let route = status.route();
        Self { status, route }
    }
}

/// Registration gate for one browsing context.
pub struct RegistrationGate {
    backend: Arc<dyn BackendConnector>,
    max_username_len: usize,
    /// Status keyed by the session serial it was computed for.
    memo: Mutex<Option<(u64, RegistrationStatus)>>,
    /// Serializes memo misses so one authentication triggers one lookup.
    resolving: tokio::sync::Mutex<()>,
}

impl RegistrationGate {
    pub fn new(backend: Arc<dyn BackendConnector>, max_username_len: usize) -> Self {
        Self {
            backend,
            max_username_len,
            memo: Mutex::new(None),
            resolving: tokio::sync::Mutex::new(()),
        }
    }

    /// Look the person up on the backend. Never cached.
    pub async fn resolve_registration(&self, session: &Session) -> RegistrationDecision {
        let principal = match session.identity() {
            Some(principal) if session.is_authenticated() => principal,
            _ => return RegistrationStatus::Unknown.into(),
        };

        let backend = self.backend.connect(Some(principal));
        let status = match backend.get_user().await {
            Ok(Some(user)) if !user.username.trim().is_empty() => {
                RegistrationStatus::Registered(user.username)
            }
            Ok(_) => RegistrationStatus::Unregistered,
            Err(e) => {
                tracing::warn!(
                    principal = %principal,
                    error = %e,
                    "User lookup failed, routing to registration"
                );
                RegistrationStatus::Unregistered
            }
        };

        tracing::debug!(principal = %principal, status = ?status, "Resolved registration");
        status.into()
    }

    /// Registration decision for this authentication, looked up at most once.
    pub async fn status_for(&self, session: &Session) -> RegistrationDecision {
        if !session.is_authenticated() {
            return RegistrationStatus::Unknown.into();
        }
        if let Some(status) = self.memoized(session.id()) {
            return status.into();
        }

        let _resolving = self.resolving.lock().await;
        if let Some(status) = self.memoized(session.id()) {
            return status.into();
        }

        let decision = self.resolve_registration(session).await;
        *self.memo.lock() = Some((session.id(), decision.status.clone()));
        decision
    }

    /// Drop whatever was remembered for the previous authentication.
    pub fn forget(&self) {
        *self.memo.lock() = None;
    }

    /// Register the signed-in person under `username`.
    pub async fn register_user(
        &self,
        session: &Session,
        username: &str,
    ) -> Result<RegistrationDecision> {
        let principal = authenticated_principal(session)?;
        let username = self.validate_username(username)?;

        let backend = self.backend.connect(Some(principal));
        match backend.register_user(&username).await {
            Ok(true) => {
                tracing::info!(principal = %principal, username = %username, "Registered user");
                Ok(self.remember(session, username))
            }
            Ok(false) => Err(AppError::Validation(
                "Registration failed. Username may already exist.".to_string(),
            )),
            Err(e) => {
                tracing::warn!(error = %e, "Registration call failed");
                Err(AppError::BackendUnavailable(
                    "An error occurred during registration.".to_string(),
                ))
            }
        }
    }

    /// Change the signed-in person's username.
    pub async fn update_username(
        &self,
        session: &Session,
        username: &str,
    ) -> Result<RegistrationDecision> {
        let principal = authenticated_principal(session)?;
        let username = self.validate_username(username)?;

        let backend = self.backend.connect(Some(principal));
        match backend.update_user(&username).await {
            Ok(true) => {
                tracing::info!(principal = %principal, username = %username, "Updated username");
                Ok(self.remember(session, username))
            }
            Ok(false) => Err(AppError::Validation(
                "Failed to update username".to_string(),
            )),
            Err(e) => {
                tracing::warn!(error = %e, "Username update call failed");
                Err(AppError::BackendUnavailable(
                    "Error updating username".to_string(),
                ))
            }
        }
    }

    fn memoized(&self, session_id: u64) -> Option<RegistrationStatus> {
        match &*self.memo.lock() {
            Some((id, status)) if *id == session_id => Some(status.clone()),
            _ => None,
        }
    }

    fn remember(&self, session: &Session, username: String) -> RegistrationDecision {
        let status = RegistrationStatus::Registered(username);
        *self.memo.lock() = Some((session.id(), status.clone()));
        status.into()
    }

    fn validate_username(&self, username: &str) -> Result<String> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }
        if username.chars().count() > self.max_username_len {
            return Err(AppError::Validation(format!(
                "Username must be at most {} characters",
                self.max_username_len
            )));
        }
        if username.chars().any(char::is_control) {
            return Err(AppError::Validation(
                "Username must not contain control characters".to_string(),
            ));
        }
        Ok(username.to_string())
    }
}

fn authenticated_principal(session: &Session) -> Result<&crate::models::Principal> {
    match session.identity() {
        Some(principal) if session.is_authenticated() => Ok(principal),
        _ => Err(AppError::Unauthorized),
    }
}
