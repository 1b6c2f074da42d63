// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! StudySphere client core.
//!
//! Session lifecycle, registration gating, per-page view aggregation and
//! search over the StudySphere backend, served to the rendering layer as a
//! small JSON API. Each browser gets its own browsing context.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use dashmap::DashMap;
use models::{DashboardView, HomeView, ProfileView};
use services::{
    BackendConnector, IdentityProvider, PageHandle, RegistrationGate, SearchDispatcher,
    SessionManager, ViewAggregator, ViewSettings,
};
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Produces a fresh identity provider for each new browsing context.
pub type IdentityFactory = Arc<dyn Fn() -> Arc<dyn IdentityProvider> + Send + Sync>;

/// Everything one browser tab session owns.
pub struct BrowsingContext {
    pub session: SessionManager,
    pub registration: RegistrationGate,
    pub home: PageHandle<HomeView>,
    pub profile: PageHandle<ProfileView>,
    pub dashboard: PageHandle<DashboardView>,
    initialized: OnceCell<()>,
    /// Wall clock millis of the latest request
    last_seen: AtomicI64,
}

impl BrowsingContext {
    pub fn new(config: &Config, provider: Arc<dyn IdentityProvider>, backend: Arc<dyn BackendConnector>) -> Self {
        Self {
            session: SessionManager::new(provider, config.identity_provider_url.clone()),
            registration: RegistrationGate::new(backend, config.max_username_len),
            home: PageHandle::new(),
            profile: PageHandle::new(),
            dashboard: PageHandle::new(),
            initialized: OnceCell::new(),
            last_seen: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn touch(&self) {
        self.last_seen.fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_seen_ms(&self) -> i64 {
        self.last_seen.load(Ordering::Relaxed)
    }

    /// Probe the identity provider once, on first use.
    pub async fn ensure_initialized(&self) {
        self.initialized
            .get_or_init(|| async {
                self.session.init().await;
            })
            .await;
    }

    /// Drop everything derived from the previous authentication.
    pub fn end_session(&self) {
        self.registration.forget();
        self.home.reset();
        self.profile.reset();
        self.dashboard.reset();
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn BackendConnector>,
    pub identity: IdentityFactory,
    pub views: ViewAggregator,
    pub search: SearchDispatcher,
    /// Browsing contexts keyed by cookie id
    pub contexts: DashMap<String, Arc<BrowsingContext>>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn BackendConnector>, identity: IdentityFactory) -> Self {
        let views = ViewAggregator::new(backend.clone(), ViewSettings::from(&config));
        let search = SearchDispatcher::new(backend.clone());
        Self {
            config,
            backend,
            identity,
            views,
            search,
            contexts: DashMap::new(),
        }
    }

    /// Look up a browsing context by id.
    pub fn context(&self, id: &str) -> Option<Arc<BrowsingContext>> {
        self.contexts.get(id).map(|ctx| ctx.value().clone())
    }

    /// Register a new browsing context under `id`.
    ///
    /// At capacity, idle contexts are swept first and then the least
    /// recently seen one is evicted.
    pub fn open_context(&self, id: String) -> Arc<BrowsingContext> {
        if self.contexts.len() >= self.config.max_contexts {
            self.sweep_idle_contexts();
        }
        while self.contexts.len() >= self.config.max_contexts.max(1) {
            if !self.evict_least_recent() {
                break;
            }
        }

        let provider = (self.identity)();
        let ctx = Arc::new(BrowsingContext::new(&self.config, provider, self.backend.clone()));
        self.contexts.insert(id, ctx.clone());
        tracing::debug!(contexts = self.contexts.len(), "Opened browsing context");
        ctx
    }

    /// Drop every context idle for longer than the configured timeout.
    /// Returns how many were dropped.
    pub fn sweep_idle_contexts(&self) -> usize {
        let idle_ms = i64::try_from(self.config.context_idle_secs.saturating_mul(1000))
            .unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(idle_ms);

        let before = self.contexts.len();
        self.contexts.retain(|_, ctx| ctx.last_seen_ms() >= cutoff);
        let swept = before.saturating_sub(self.contexts.len());
        if swept > 0 {
            tracing::info!(swept, remaining = self.contexts.len(), "Swept idle browsing contexts");
        }
        swept
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .contexts
            .iter()
            .min_by_key(|entry| entry.value().last_seen_ms())
            .map(|entry| entry.key().clone());

        match oldest {
            Some(id) => {
                self.contexts.remove(&id);
                tracing::warn!(
                    max = self.config.max_contexts,
                    "Browsing context limit reached, evicted oldest"
                );
                true
            }
            None => false,
        }
    }
}
