// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! StudySphere client server
//!
//! Serves session, registration, page views and search to the rendering
//! layer, backed by the StudySphere backend gateway and identity provider.

use studysphere_client::{
    config::Config,
    services::{BackendConnector, HttpBackendConnector, HttpIdentityProvider, IdentityProvider},
    AppState, IdentityFactory,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONTEXT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting StudySphere client");

    let backend: Arc<dyn BackendConnector> = Arc::new(
        HttpBackendConnector::new(&config.backend_url).expect("Failed to build backend client"),
    );
    tracing::info!(backend = %config.backend_url, "Backend gateway configured");

    // One HTTP pool for the identity provider, one stored delegation per context
    let identity_http =
        HttpIdentityProvider::http_client().expect("Failed to build identity provider client");
    let identity_url = config.identity_provider_url.clone();
    let identity: IdentityFactory = Arc::new(move || {
        Arc::new(HttpIdentityProvider::new(identity_http.clone(), identity_url.clone()))
            as Arc<dyn IdentityProvider>
    });
    tracing::info!(
        identity_provider = %config.identity_provider_url,
        "Identity provider configured"
    );

    let state = Arc::new(AppState::new(config.clone(), backend, identity));

    // open_context also sweeps, but only once at capacity
    tokio::spawn({
        let state = state.clone();
        async move {
            let mut ticker = tokio::time::interval(CONTEXT_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                state.sweep_idle_contexts();
            }
        }
    });

    let app = studysphere_client::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("studysphere_client=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
