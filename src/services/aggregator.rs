// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View aggregation: one backend fan-out per page, one view model out.
//!
//! Handles:
//! - Concurrent issue of independent queries, chained issue of dependent ones
//! - Per-field failure isolation (failed fields take their default and are
//!   listed in `degraded`)
//! - Pure derived computations (featured groups, announcements, membership)
//! - Publishing complete views through `PageHandle`

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    DashboardView, FieldFailure, GroupInfo, HomeView, Nat, NoteNft, PageState, Principal,
    ProfileStats, ProfileView, Session,
};
use crate::services::backend::{Backend, BackendConnector};
use crate::services::normalize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

const GUEST_NAME: &str = "Guest";
const DEFAULT_USER_NAME: &str = "User";
const DASHBOARD_PREVIEW_LEN: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Page publication
// ─────────────────────────────────────────────────────────────────────────────

/// Publishes one page's state. Only complete views are ever published.
pub struct PageHandle<V> {
    state: watch::Sender<PageState<V>>,
    generation: AtomicU64,
}

impl<V> Default for PageHandle<V> {
    fn default() -> Self {
        let (state, _) = watch::channel(PageState::default());
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }
}

impl<V> PageHandle<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<PageState<V>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PageState<V> {
        let state = self.state.borrow();
        PageState {
            loading: state.loading,
            generation: state.generation,
            view: state.view.clone(),
        }
    }

    /// Run one aggregation pass and publish its view.
    ///
    /// `loading` is set before the pass starts and cleared when it settles,
    /// or when the returned future is dropped first. Returns `None` if the
    /// pass was superseded or the page was left while it ran; its view is
    /// then dropped unpublished.
    pub async fn load<F>(&self, pass: F) -> Option<Arc<V>>
    where
        F: Future<Output = V>,
    {
        let running = self.begin();
        let view = pass.await;
        running.publish(view)
    }

    /// Like `load`, for passes that can fail as a whole. On failure the
    /// previous view stays and `loading` is cleared.
    pub async fn try_load<F, E>(&self, pass: F) -> std::result::Result<Option<Arc<V>>, E>
    where
        F: Future<Output = std::result::Result<V, E>>,
    {
        let running = self.begin();
        Ok(running.publish(pass.await?))
    }

    fn begin(&self) -> RunningPass<'_, V> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.generation = generation;
        });
        RunningPass {
            page: self,
            generation,
        }
    }

    /// Apply `update` only if `generation` is still the latest pass.
    fn update_if_current(&self, generation: u64, update: impl FnOnce(&mut PageState<V>)) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            update(state);
            true
        })
    }

    /// Leave the page: any pass still running will not publish.
    pub fn navigate_away(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = false;
            state.generation = generation;
        });
    }

    /// Leave the page and forget its last view.
    pub fn reset(&self) {
        self.navigate_away();
        self.state.send_modify(|state| state.view = None);
    }
}

/// One in-flight pass. Dropping it unpublished clears `loading` for its
/// generation.
struct RunningPass<'a, V> {
    page: &'a PageHandle<V>,
    generation: u64,
}

impl<V> RunningPass<'_, V> {
    fn publish(self, view: V) -> Option<Arc<V>> {
        let view = Arc::new(view);
        let published = self.page.update_if_current(self.generation, |state| {
            state.loading = false;
            state.view = Some(view.clone());
        });

        if published {
            Some(view)
        } else {
            tracing::debug!(generation = self.generation, "Discarding superseded aggregation pass");
            None
        }
    }
}

impl<V> Drop for RunningPass<'_, V> {
    fn drop(&mut self) {
        let page = self.page;
        page.state.send_if_modified(|state| {
            let stale = page.generation.load(Ordering::SeqCst) != self.generation;
            if stale || !state.loading {
                return false;
            }
            state.loading = false;
            true
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field settlement
// ─────────────────────────────────────────────────────────────────────────────

/// Collects the fields that fell back to their defaults.
#[derive(Default)]
struct Settler {
    failures: Vec<FieldFailure>,
}

impl Settler {
    fn settle<T>(&mut self, field: &'static str, result: Result<T>, default: T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(field, error = %e, "View field degraded to default");
                self.failures.push(FieldFailure {
                    field,
                    kind: e.kind(),
                    message: e.to_string(),
                });
                default
            }
        }
    }

    /// Like `settle`, for queries that were skipped when signed out.
    fn settle_optional<T>(
        &mut self,
        field: &'static str,
        result: Option<Result<T>>,
        default: T,
    ) -> T {
        match result {
            Some(result) => self.settle(field, result, default),
            None => default,
        }
    }

    fn into_failures(self) -> Vec<FieldFailure> {
        self.failures
    }
}

/// Issue `query` only when `enabled`.
async fn when<T>(enabled: bool, query: impl Future<Output = Result<T>>) -> Option<Result<T>> {
    if enabled {
        Some(query.await)
    } else {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Derived computations
// ─────────────────────────────────────────────────────────────────────────────

/// Top `count` groups by member count, ties broken by name.
pub fn featured_groups(groups: &[GroupInfo], count: usize) -> Vec<GroupInfo> {
    let mut ranked: Vec<&GroupInfo> = groups.iter().collect();
    ranked.sort_by(|a, b| {
        b.member_count()
            .cmp(&a.member_count())
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.into_iter().take(count).cloned().collect()
}

/// First group whose name contains one of `keywords` (case-insensitive).
pub fn announcement_group<'a>(groups: &'a [GroupInfo], keywords: &[String]) -> Option<&'a GroupInfo> {
    groups.iter().find(|group| {
        let name = group.name.to_lowercase();
        keywords
            .iter()
            .any(|keyword| name.contains(&keyword.to_lowercase()))
    })
}

/// The last `count` items, oldest first.
pub fn latest_window<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    items[items.len().saturating_sub(count)..].to_vec()
}

pub fn joined_groups(groups: &[GroupInfo], principal_text: &str) -> Vec<GroupInfo> {
    groups
        .iter()
        .filter(|group| group.member_texts.iter().any(|m| m == principal_text))
        .cloned()
        .collect()
}

pub fn created_groups(groups: &[GroupInfo], principal_text: &str) -> Vec<GroupInfo> {
    groups
        .iter()
        .filter(|group| group.creator_text == principal_text)
        .cloned()
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// ViewAggregator
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning knobs for the derived fields.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub featured_group_count: usize,
    pub recent_note_count: usize,
    pub announcement_count: usize,
    pub announcement_keywords: Vec<String>,
}

impl From<&Config> for ViewSettings {
    fn from(config: &Config) -> Self {
        Self {
            featured_group_count: config.featured_group_count,
            recent_note_count: config.recent_note_count,
            announcement_count: config.announcement_count,
            announcement_keywords: config.announcement_keywords.clone(),
        }
    }
}

/// Builds page view models from backend queries.
#[derive(Clone)]
pub struct ViewAggregator {
    backend: Arc<dyn BackendConnector>,
    settings: ViewSettings,
}

impl ViewAggregator {
    pub fn new(backend: Arc<dyn BackendConnector>, settings: ViewSettings) -> Self {
        Self { backend, settings }
    }

    /// Home page. Personal fields are only queried when signed in.
    pub async fn home(&self, session: &Session) -> HomeView {
        let principal = signed_in(session);
        let authed = principal.is_some();
        let backend = self.backend.connect(principal);

        let (user, tokens, (groups, announcements), user_count, notes) = tokio::join!(
            when(authed, backend.get_user()),
            when(authed, async { normalize::nat(&backend.get_tokens().await?) }),
            self.groups_with_announcements(backend.as_ref(), authed),
            async { normalize::nat(&backend.get_user_count().await?) },
            when(authed, async {
                normalize::notes(&backend.get_user_notes(principal).await?)
            }),
        );

        let mut settler = Settler::default();
        let user = settler.settle_optional("user_name", user, None);
        let user_name = if authed {
            user.map(|u| u.username)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string())
        } else {
            GUEST_NAME.to_string()
        };
        let token_balance = settler.settle_optional("token_balance", tokens, 0);
        let groups = settler.settle("groups", groups, Vec::new());
        let announcements = settler.settle("announcements", announcements, Vec::new());
        let user_count = settler.settle("user_count", user_count, 0);
        let notes = settler.settle_optional("recent_notes", notes, Vec::new());

        let view = HomeView {
            user_name,
            token_balance,
            user_count,
            group_count: groups.len(),
            featured_groups: featured_groups(&groups, self.settings.featured_group_count),
            recent_notes: latest_window(&notes, self.settings.recent_note_count),
            groups,
            announcements,
            degraded: settler.into_failures(),
        };

        tracing::debug!(
            authenticated = authed,
            groups = view.group_count,
            degraded = view.degraded.len(),
            "Home view aggregated"
        );
        view
    }

    /// Groups, then the announcement channel's messages once groups are known.
    async fn groups_with_announcements(
        &self,
        backend: &dyn Backend,
        authed: bool,
    ) -> (Result<Vec<GroupInfo>>, Result<Vec<String>>) {
        let groups = match backend.get_groups().await {
            Ok(raw) => normalize::groups(&raw),
            Err(e) => Err(e),
        };
        let groups = match groups {
            Ok(groups) => groups,
            Err(e) => return (Err(e), Ok(Vec::new())),
        };

        let announcements = match announcement_group(&groups, &self.settings.announcement_keywords) {
            Some(group) if authed => self.announcements(backend, group).await,
            _ => Ok(Vec::new()),
        };

        (Ok(groups), announcements)
    }

    async fn announcements(&self, backend: &dyn Backend, group: &GroupInfo) -> Result<Vec<String>> {
        let group_id = Nat::parse(&group.id)?;
        let messages = backend.get_messages(&group_id).await?.unwrap_or_default();
        let texts = normalize::message_texts(&messages);
        Ok(latest_window(&texts, self.settings.announcement_count))
    }

    /// Profile page. Requires a signed-in session.
    pub async fn profile(&self, session: &Session) -> Result<ProfileView> {
        let principal = signed_in(session).ok_or(AppError::Unauthorized)?;
        let principal_text = principal.to_text();
        let backend = self.backend.connect(Some(principal));

        let (user, tokens, groups, notes) = tokio::join!(
            backend.get_user(),
            async { normalize::nat(&backend.get_tokens().await?) },
            async { normalize::groups(&backend.get_groups().await?) },
            async { normalize::notes(&backend.get_user_notes(Some(principal)).await?) },
        );

        let mut settler = Settler::default();
        let username = settler
            .settle("username", user, None)
            .map(|u| u.username)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
        let token_balance = settler.settle("token_balance", tokens, 0);
        let groups = settler.settle("groups", groups, Vec::new());
        let notes = settler.settle("notes", notes, Vec::new());

        let joined_groups = joined_groups(&groups, &principal_text);
        let created_groups = created_groups(&groups, &principal_text);

        Ok(ProfileView {
            stats: ProfileStats {
                groups_joined: joined_groups.len(),
                groups_created: created_groups.len(),
                notes_minted: notes.len(),
                tokens: token_balance,
            },
            recent_group: joined_groups.last().map(|g| g.name.clone()),
            recent_note: notes.last().map(|n| n.title.clone()),
            principal_text,
            username,
            token_balance,
            joined_groups,
            created_groups,
            notes,
            degraded: settler.into_failures(),
        })
    }

    /// Compact dashboard over the caller-scoped backend calls.
    pub async fn dashboard(&self, session: &Session) -> DashboardView {
        let principal = signed_in(session);
        let backend = self.backend.connect(principal);

        let (user, balance, groups, notes) = tokio::join!(
            backend.get_user(),
            async { normalize::nat(&backend.get_balance().await?) },
            async { normalize::groups(&backend.get_user_groups().await?) },
            async { normalize::notes(&backend.get_user_notes(None).await?) },
        );

        let mut settler = Settler::default();
        let user = settler.settle("user", user, None);
        let token_balance = settler.settle("token_balance", balance, 0);
        let groups: Vec<GroupInfo> = settler.settle("groups", groups, Vec::new());
        let notes: Vec<NoteNft> = settler.settle("notes", notes, Vec::new());

        DashboardView {
            username: user.as_ref().map(|u| u.username.clone()),
            principal_text: user.map(|u| u.principal.to_text()),
            token_balance,
            groups: groups.into_iter().take(DASHBOARD_PREVIEW_LEN).collect(),
            notes: notes.into_iter().take(DASHBOARD_PREVIEW_LEN).collect(),
            degraded: settler.into_failures(),
        }
    }
}

fn signed_in(session: &Session) -> Option<&Principal> {
    session.identity().filter(|_| session.is_authenticated())
}
