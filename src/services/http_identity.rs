// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider reached over HTTP.
//!
//! `POST {url}/authorize` runs the ceremony and returns a delegation;
//! `POST {url}/logout` revokes it. The delegation is held in memory per
//! browsing context until it expires or the person logs out.

use crate::error::AppError;
use crate::models::Principal;
use crate::services::identity::{Identity, IdentityClient, IdentityProvider, LoginOptions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Deserialize)]
struct AuthorizeResponse {
    /// Absent when the provider hands back an identity without a principal
    #[serde(default)]
    principal: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Delegation {
    principal: Option<Principal>,
    expires_at: Option<DateTime<Utc>>,
}

impl Delegation {
    fn is_live(&self) -> bool {
        self.expires_at.map_or(true, |expiry| expiry > Utc::now())
    }
}

impl Identity for Delegation {
    fn principal(&self) -> Option<Principal> {
        self.principal.clone()
    }
}

/// Identity provider for one browsing context.
pub struct HttpIdentityProvider {
    client: Arc<HttpIdentityClient>,
}

impl HttpIdentityProvider {
    /// `http` is shared between contexts; the stored delegation is not.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(HttpIdentityClient {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                delegation: Arc::new(RwLock::new(None)),
            }),
        }
    }

    pub fn http_client() -> anyhow::Result<reqwest::Client> {
        use anyhow::Context;
        reqwest::Client::builder()
            .timeout(LOGIN_TIMEOUT)
            .build()
            .context("failed building identity provider HTTP client")
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create(&self) -> Result<Arc<dyn IdentityClient>, AppError> {
        Ok(self.client.clone())
    }
}

pub struct HttpIdentityClient {
    http: reqwest::Client,
    base_url: String,
    delegation: Arc<RwLock<Option<Delegation>>>,
}

impl HttpIdentityClient {
    fn live_delegation(&self) -> Option<Delegation> {
        let mut slot = self.delegation.write();
        if slot.as_ref().is_some_and(|d| !d.is_live()) {
            tracing::debug!("Stored delegation expired");
            *slot = None;
        }
        slot.clone()
    }
}

async fn authorize(http: &reqwest::Client, url: &str) -> Result<Delegation, String> {
    let response = http
        .post(format!("{url}/authorize"))
        .send()
        .await
        .map_err(|e| format!("identity provider unreachable: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(if body.trim().is_empty() {
            format!("identity provider returned {status}")
        } else {
            body
        });
    }

    let body: AuthorizeResponse = response
        .json()
        .await
        .map_err(|e| format!("malformed identity provider response: {e}"))?;

    let principal = match body.principal {
        Some(text) => Some(Principal::from_text(&text).map_err(|e| e.to_string())?),
        None => None,
    };

    Ok(Delegation {
        principal,
        expires_at: body.expires_at,
    })
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn is_authenticated(&self) -> Result<bool, AppError> {
        Ok(self
            .live_delegation()
            .is_some_and(|d| d.principal.is_some()))
    }

    fn identity(&self) -> Option<Arc<dyn Identity>> {
        self.live_delegation()
            .map(|d| Arc::new(d) as Arc<dyn Identity>)
    }

    fn login(&self, options: LoginOptions) {
        let http = self.http.clone();
        let delegation = self.delegation.clone();
        let url = options.identity_provider_url.trim_end_matches('/').to_string();

        tokio::spawn(async move {
            match authorize(&http, &url).await {
                Ok(granted) => {
                    *delegation.write() = Some(granted);
                    (options.on_success)();
                }
                Err(reason) => (options.on_error)(reason),
            }
        });
    }

    async fn logout(&self) -> Result<(), AppError> {
        self.delegation.write().take();

        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("logout request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::IdentityProvider(format!(
                "logout returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_expiry() {
        let live = Delegation {
            principal: Some(Principal::anonymous()),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        };
        let expired = Delegation {
            expires_at: Some(Utc::now() - chrono::Duration::seconds(1)),
            ..live.clone()
        };
        assert!(live.is_live());
        assert!(!expired.is_live());
        assert!(Delegation { principal: None, expires_at: None }.is_live());
    }

    #[tokio::test]
    async fn test_expired_delegation_is_dropped() {
        let provider = HttpIdentityProvider::new(reqwest::Client::new(), "http://127.0.0.1:9");
        *provider.client.delegation.write() = Some(Delegation {
            principal: Some(Principal::anonymous()),
            expires_at: Some(Utc::now() - chrono::Duration::seconds(1)),
        });

        let client = provider.create().await.unwrap();
        assert!(!client.is_authenticated().await.unwrap());
        assert!(client.identity().is_none());
    }

    #[test]
    fn test_authorize_response_without_principal() {
        let body: AuthorizeResponse = serde_json::from_str("{}").unwrap();
        assert!(body.principal.is_none());
        assert!(body.expires_at.is_none());
    }
}
