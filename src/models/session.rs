// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session snapshot and registration status.

use crate::models::Principal;
use serde::Serialize;

/// Authentication state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed(String),
}

/// Immutable session snapshot.
///
/// `principal_text` is present iff the state is `Authenticated`; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Serial of the authentication this snapshot belongs to (0 when not authenticated)
    id: u64,
    #[serde(flatten)]
    state: SessionState,
    #[serde(skip)]
    identity: Option<Principal>,
    principal_text: Option<String>,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self {
            id: 0,
            state: SessionState::Unauthenticated,
            identity: None,
            principal_text: None,
        }
    }

    pub fn authenticating() -> Self {
        Self {
            state: SessionState::Authenticating,
            ..Self::unauthenticated()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: SessionState::Failed(reason.into()),
            ..Self::unauthenticated()
        }
    }

    pub fn authenticated(id: u64, principal: Principal) -> Self {
        let principal_text = principal.to_text();
        Self {
            id,
            state: SessionState::Authenticated,
            identity: Some(principal),
            principal_text: Some(principal_text),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// The opaque identity token, when authenticated.
    pub fn identity(&self) -> Option<&Principal> {
        self.identity.as_ref()
    }

    pub fn principal_text(&self) -> Option<&str> {
        self.principal_text.as_deref()
    }

    /// Failure reason of a settled login attempt.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Whether the authenticated person has a profile on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "username", rename_all = "snake_case")]
pub enum RegistrationStatus {
    Unknown,
    Registered(String),
    Unregistered,
}

/// Where the rendering layer should send the person next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Not signed in: stay on the landing page.
    Landing,
    /// Signed in without a profile: go to registration.
    Register,
    /// Signed in and registered: proceed to the profile/home pages.
    Profile,
}

impl RegistrationStatus {
    /// Routing decision for an authenticated session with this status.
    pub fn route(&self) -> Route {
        match self {
            RegistrationStatus::Registered(_) => Route::Profile,
            RegistrationStatus::Unregistered => Route::Register,
            RegistrationStatus::Unknown => Route::Landing,
        }
    }
}
