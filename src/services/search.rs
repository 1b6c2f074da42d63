// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Search dispatch by category.
//!
//! Groups are filtered locally over the full listing; notes and users are
//! matched by the backend.

use crate::error::Result;
use crate::models::{SearchCategory, SearchResult};
use crate::services::backend::BackendConnector;
use crate::services::normalize;
use std::sync::Arc;

#[derive(Clone)]
pub struct SearchDispatcher {
    backend: Arc<dyn BackendConnector>,
}

impl SearchDispatcher {
    pub fn new(backend: Arc<dyn BackendConnector>) -> Self {
        Self { backend }
    }

    /// Run one search. A blank term returns an empty result without a
    /// backend call.
    pub async fn search(&self, term: &str, category: SearchCategory) -> Result<SearchResult> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchResult::empty(category));
        }

        let backend = self.backend.connect(None);
        let items = match category {
            SearchCategory::Groups => {
                let needle = term.to_lowercase();
                normalize::groups(&backend.get_groups().await?)?
                    .into_iter()
                    .filter(|group| group.name.to_lowercase().contains(&needle))
                    .map(normalize::group_item)
                    .collect()
            }
            SearchCategory::Notes => normalize::notes(&backend.search_notes(term).await?)?
                .into_iter()
                .map(normalize::note_item)
                .collect(),
            SearchCategory::Users => backend
                .get_user_by_username(term)
                .await?
                .iter()
                .map(normalize::user_item)
                .collect(),
        };

        let result = SearchResult { category, items };
        tracing::debug!(
            category = ?category,
            term = %term,
            hits = result.items.len(),
            "Search dispatched"
        );
        Ok(result)
    }

    /// Every group, for the browse tab.
    pub async fn browse_groups(&self) -> Result<SearchResult> {
        let backend = self.backend.connect(None);
        let items = normalize::groups(&backend.get_groups().await?)?
            .into_iter()
            .map(normalize::group_item)
            .collect();
        Ok(SearchResult {
            category: SearchCategory::Groups,
            items,
        })
    }
}
