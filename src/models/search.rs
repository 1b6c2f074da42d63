// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Category-independent search results.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a search looks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Groups,
    Notes,
    Users,
}

impl FromStr for SearchCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groups" => Ok(SearchCategory::Groups),
            "notes" => Ok(SearchCategory::Notes),
            "users" => Ok(SearchCategory::Users),
            other => Err(AppError::Validation(format!(
                "unknown search category {other:?}"
            ))),
        }
    }
}

/// Category-specific fields of a search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDetail {
    Group {
        creator_text: String,
        member_count: usize,
        created_at_ms: u64,
    },
    Note {
        subject: String,
        price_tokens: u64,
        owner_text: String,
    },
    User {
        principal_text: String,
    },
}

/// One search hit: a common `id`/`label` pair plus category fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchItem {
    pub id: String,
    pub label: String,
    pub detail: ItemDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub category: SearchCategory,
    pub items: Vec<SearchItem>,
}

impl SearchResult {
    pub fn empty(category: SearchCategory) -> Self {
        Self {
            category,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
