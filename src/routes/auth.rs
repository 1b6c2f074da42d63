// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: inspect, log in, log out.

use crate::error::Result;
use crate::middleware::CurrentContext;
use crate::models::{RegistrationStatus, Session};
use crate::services::RegistrationDecision;
use crate::AppState;
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", get(get_session))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Session snapshot plus where to send the person next.
#[derive(Serialize)]
pub struct SessionResponse {
    pub session: Arc<Session>,
    pub registration: RegistrationDecision,
}

async fn decide(ctx: &CurrentContext, session: Arc<Session>) -> SessionResponse {
    let registration = if session.is_authenticated() {
        ctx.0.registration.status_for(&session).await
    } else {
        RegistrationStatus::Unknown.into()
    };
    SessionResponse {
        session,
        registration,
    }
}

async fn get_session(Extension(ctx): Extension<CurrentContext>) -> Json<SessionResponse> {
    let session = ctx.0.session.current();
    Json(decide(&ctx, session).await)
}

/// Run the login ceremony. Resolves once the provider settles.
async fn login(Extension(ctx): Extension<CurrentContext>) -> Result<Json<SessionResponse>> {
    let session = ctx.0.session.login().await?;
    Ok(Json(decide(&ctx, session).await))
}

async fn logout(Extension(ctx): Extension<CurrentContext>) -> Json<SessionResponse> {
    let session = ctx.0.session.logout().await;
    ctx.0.end_session();
    Json(decide(&ctx, session).await)
}
