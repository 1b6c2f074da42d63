// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: registration, page views and search.

use crate::error::{AppError, Result};
use crate::middleware::CurrentContext;
use crate::models::{DashboardView, HomeView, PageState, ProfileView, SearchCategory, SearchResult};
use crate::services::RegistrationDecision;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Session-bound API routes. The browsing context middleware is applied in
/// routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/registration", get(get_registration))
        .route("/api/register", post(register))
        .route("/api/username", put(update_username))
        .route("/api/home", get(get_home))
        .route("/api/profile", get(get_profile))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/pages/{page}/leave", post(leave_page))
}

/// Search routes. These read public data only and run without a context.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/groups", get(browse_groups))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

async fn get_registration(Extension(ctx): Extension<CurrentContext>) -> Json<RegistrationDecision> {
    let session = ctx.0.session.current();
    Json(ctx.0.registration.status_for(&session).await)
}

async fn register(
    Extension(ctx): Extension<CurrentContext>,
    Json(body): Json<UsernameRequest>,
) -> Result<Json<RegistrationDecision>> {
    let session = ctx.0.session.current();
    let decision = ctx.0.registration.register_user(&session, &body.username).await?;
    Ok(Json(decision))
}

async fn update_username(
    Extension(ctx): Extension<CurrentContext>,
    Json(body): Json<UsernameRequest>,
) -> Result<Json<RegistrationDecision>> {
    let session = ctx.0.session.current();
    let decision = ctx.0.registration.update_username(&session, &body.username).await?;
    Ok(Json(decision))
}

// ─── Page views ──────────────────────────────────────────────

async fn get_home(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<CurrentContext>,
) -> Json<PageState<HomeView>> {
    let session = ctx.0.session.current();
    ctx.0.home.load(state.views.home(&session)).await;
    Json(ctx.0.home.snapshot())
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<CurrentContext>,
) -> Result<Json<PageState<ProfileView>>> {
    let session = ctx.0.session.current();
    ctx.0.profile.try_load(state.views.profile(&session)).await?;
    Ok(Json(ctx.0.profile.snapshot()))
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<CurrentContext>,
) -> Json<PageState<DashboardView>> {
    let session = ctx.0.session.current();
    ctx.0.dashboard.load(state.views.dashboard(&session)).await;
    Json(ctx.0.dashboard.snapshot())
}

/// Abandon whatever the page is still loading.
async fn leave_page(
    Extension(ctx): Extension<CurrentContext>,
    Path(page): Path<String>,
) -> Result<StatusCode> {
    match page.as_str() {
        "home" => ctx.0.home.navigate_away(),
        "profile" => ctx.0.profile.navigate_away(),
        "dashboard" => ctx.0.dashboard.navigate_away(),
        other => return Err(AppError::NotFound(format!("page {other:?}"))),
    }
    Ok(StatusCode::NO_CONTENT)
}

// ─── Search ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub term: String,
    pub category: Option<String>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>> {
    let category = match params.category.as_deref() {
        Some(raw) => raw.parse::<SearchCategory>()?,
        None => SearchCategory::Groups,
    };
    Ok(Json(state.search.search(&params.term, category).await?))
}

async fn browse_groups(State(state): State<Arc<AppState>>) -> Result<Json<SearchResult>> {
    Ok(Json(state.search.browse_groups().await?))
}
