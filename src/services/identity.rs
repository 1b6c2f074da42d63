// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider contract.
//!
//! Mirrors the provider's own client API, callbacks included. The session
//! manager is the only consumer and turns the callback pair into a single
//! awaited result.

use crate::error::AppError;
use crate::models::Principal;
use async_trait::async_trait;
use std::sync::Arc;

/// Entry point of the identity provider: hands out clients.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn IdentityClient>, AppError>;
}

/// A client bound to the provider's stored session.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, AppError>;

    /// The identity currently held by the client, if any.
    fn identity(&self) -> Option<Arc<dyn Identity>>;

    /// Start the login ceremony. Completion is reported through the callbacks.
    fn login(&self, options: LoginOptions);

    async fn logout(&self) -> Result<(), AppError>;
}

/// An identity handed back by the provider.
pub trait Identity: Send + Sync {
    /// Principal-extraction capability; `None` when the identity lacks it.
    fn principal(&self) -> Option<Principal>;
}

pub type SuccessCallback = Box<dyn FnOnce() + Send>;
pub type ErrorCallback = Box<dyn FnOnce(String) + Send>;

/// Arguments of `IdentityClient::login`.
pub struct LoginOptions {
    pub identity_provider_url: String,
    pub on_success: SuccessCallback,
    pub on_error: ErrorCallback,
}

impl LoginOptions {
    pub fn new(
        identity_provider_url: impl Into<String>,
        on_success: impl FnOnce() + Send + 'static,
        on_error: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        Self {
            identity_provider_url: identity_provider_url.into(),
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }
}

/// Identity that always exposes its principal.
#[derive(Debug, Clone)]
pub struct PrincipalIdentity(pub Principal);

impl Identity for PrincipalIdentity {
    fn principal(&self) -> Option<Principal> {
        Some(self.0.clone())
    }
}
