// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-page view models consumed by the rendering layer.
//!
//! Everything in here is already normalized: plain numbers, strings and
//! millisecond timestamps. No principal or backend integer survives past
//! the aggregation boundary.

use serde::Serialize;
use std::sync::Arc;

/// Read-only projection of a study group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub creator_text: String,
    pub member_texts: Vec<String>,
    pub created_at_ms: u64,
    /// RFC3339 rendering of `created_at_ms`
    pub created_at: Option<String>,
}

impl GroupInfo {
    pub fn member_count(&self) -> usize {
        self.member_texts.len()
    }
}

/// Read-only projection of a minted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteNft {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub price_tokens: u64,
    pub owner_text: String,
}

/// A view field that fell back to its default during an aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub field: &'static str,
    /// Error category, as reported by `AppError::kind`
    pub kind: &'static str,
    pub message: String,
}

/// Home page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeView {
    /// "Guest" when signed out, "User" when the record has no username
    pub user_name: String,
    pub token_balance: u64,
    pub user_count: u64,
    pub group_count: usize,
    pub groups: Vec<GroupInfo>,
    pub featured_groups: Vec<GroupInfo>,
    pub recent_notes: Vec<NoteNft>,
    /// Oldest first
    pub announcements: Vec<String>,
    pub degraded: Vec<FieldFailure>,
}

/// Headline numbers on the profile card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub groups_joined: usize,
    pub groups_created: usize,
    pub notes_minted: usize,
    pub tokens: u64,
}

/// Profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub principal_text: String,
    pub username: String,
    pub token_balance: u64,
    pub joined_groups: Vec<GroupInfo>,
    pub created_groups: Vec<GroupInfo>,
    pub notes: Vec<NoteNft>,
    pub stats: ProfileStats,
    pub recent_group: Option<String>,
    pub recent_note: Option<String>,
    pub degraded: Vec<FieldFailure>,
}

/// Compact dashboard built from the per-user backend calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub username: Option<String>,
    pub principal_text: Option<String>,
    pub token_balance: u64,
    pub groups: Vec<GroupInfo>,
    pub notes: Vec<NoteNft>,
    pub degraded: Vec<FieldFailure>,
}

/// What a page currently shows: a loading flag plus the last complete view.
#[derive(Debug, Clone, Serialize)]
pub struct PageState<V> {
    pub loading: bool,
    /// Aggregation pass that produced (or is producing) this state
    pub generation: u64,
    pub view: Option<Arc<V>>,
}

impl<V> Default for PageState<V> {
    fn default() -> Self {
        Self {
            loading: false,
            generation: 0,
            view: None,
        }
    }
}
