// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the backend gateway.
//!
//! Each backend call is a `POST {base_url}/{method}` with a JSON argument
//! object. The caller's principal travels as a bearer token; anonymous
//! calls carry none.

use crate::error::AppError;
use crate::models::{GroupRecord, Message, Nat, NoteRecord, Principal, User};
use crate::services::backend::{Backend, BackendConnector};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connector that hands out HTTP backends sharing one connection pool.
#[derive(Clone)]
pub struct HttpBackendConnector {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackendConnector {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl BackendConnector for HttpBackendConnector {
    fn connect(&self, caller: Option<&Principal>) -> Arc<dyn Backend> {
        Arc::new(HttpBackend {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            caller: caller.map(Principal::to_text),
        })
    }
}

/// Backend client acting as one caller.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    caller: Option<String>,
}

impl HttpBackend {
    /// Invoke a backend method and decode its JSON reply.
    async fn call<A, T>(&self, method: &str, args: &A) -> Result<T, AppError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);

        let mut request = self.http.post(&url).json(args);
        if let Some(caller) = &self.caller {
            request = request.bearer_auth(caller);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::BackendUnavailable(format!("{}: {}", method, e)))?;

        self.check_response_json(method, response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!(method, "Backend rate limit hit (429)");
            }

            return Err(AppError::BackendUnavailable(format!(
                "{}: HTTP {}: {}",
                method, status, body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::BackendUnavailable(format!("{}: {}", method, e)))?;
        decode_reply(method, &body)
    }
}

/// Decode a reply body. Well-formed JSON carrying values that do not convert
/// (bad principal text, non-numeric naturals) is a validation failure; a
/// truncated or garbled body means the backend is not answering properly.
fn decode_reply<T: DeserializeOwned>(method: &str, body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| match e.classify() {
        Category::Data => AppError::Validation(format!("{}: {}", method, e)),
        Category::Io | Category::Syntax | Category::Eof => {
            AppError::BackendUnavailable(format!("{}: JSON parse error: {}", method, e))
        }
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_user(&self) -> Result<Option<User>, AppError> {
        self.call("getUser", &json!({})).await
    }

    async fn get_tokens(&self) -> Result<Nat, AppError> {
        self.call("getTokens", &json!({})).await
    }

    async fn get_balance(&self) -> Result<Nat, AppError> {
        self.call("getBalance", &json!({})).await
    }

    async fn get_groups(&self) -> Result<Vec<(Nat, GroupRecord)>, AppError> {
        self.call("getGroups", &json!({})).await
    }

    async fn get_user_groups(&self) -> Result<Vec<(Nat, GroupRecord)>, AppError> {
        self.call("getUserGroups", &json!({})).await
    }

    async fn get_user_notes(&self, owner: Option<&Principal>) -> Result<Vec<NoteRecord>, AppError> {
        self.call("getUserNotes", &json!({ "owner": owner })).await
    }

    async fn search_notes(&self, term: &str) -> Result<Vec<NoteRecord>, AppError> {
        self.call("searchNotes", &json!({ "term": term })).await
    }

    async fn get_user_by_username(&self, term: &str) -> Result<Option<User>, AppError> {
        self.call("getUserByUsername", &json!({ "username": term }))
            .await
    }

    async fn get_user_count(&self) -> Result<Nat, AppError> {
        self.call("getUserCount", &json!({})).await
    }

    async fn get_messages(&self, group_id: &Nat) -> Result<Option<Vec<Message>>, AppError> {
        self.call("getMessages", &json!({ "groupId": group_id }))
            .await
    }

    async fn register_user(&self, username: &str) -> Result<bool, AppError> {
        self.call("registerUser", &json!({ "username": username }))
            .await
    }

    async fn update_user(&self, username: &str) -> Result<bool, AppError> {
        self.call("updateUser", &json!({ "username": username }))
            .await
    }
}
