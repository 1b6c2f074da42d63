// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Browsing context middleware.
//!
//! Requests to session-bound routes are attached to a browsing context
//! identified by the `studysphere_ctx` cookie. Unknown or malformed ids get
//! a fresh context. Contexts idle past `CONTEXT_IDLE_SECS` are swept.

use crate::error::AppError;
use crate::{AppState, BrowsingContext};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

pub const CONTEXT_COOKIE: &str = "studysphere_ctx";

const CONTEXT_ID_BYTES: usize = 16;

/// Browsing context bound to the current request.
#[derive(Clone)]
pub struct CurrentContext(pub Arc<BrowsingContext>);

/// Middleware that attaches a browsing context, creating one if needed.
pub async fn attach_context(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let existing = jar
        .get(CONTEXT_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|id| is_well_formed(id))
        .and_then(|id| state.context(id));

    let (ctx, jar) = match existing {
        Some(ctx) => {
            ctx.touch();
            (ctx, jar)
        }
        None => {
            let id = new_context_id()?;
            let ctx = state.open_context(id.clone());
            let secure = state.config.frontend_url.starts_with("https://");
            let cookie = Cookie::build((CONTEXT_COOKIE, id))
                .path("/")
                .http_only(true)
                .secure(secure)
                .same_site(SameSite::Lax);
            (ctx, jar.add(cookie))
        }
    };

    ctx.ensure_initialized().await;
    request.extensions_mut().insert(CurrentContext(ctx));

    Ok((jar, next.run(request).await).into_response())
}

fn new_context_id() -> Result<String, AppError> {
    let mut bytes = [0u8; CONTEXT_ID_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG unavailable")))?;
    Ok(hex::encode(bytes))
}

fn is_well_formed(id: &str) -> bool {
    id.len() == CONTEXT_ID_BYTES * 2 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
