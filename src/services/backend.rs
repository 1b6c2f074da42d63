// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend service contract.
//!
//! Every call is asynchronous and may fail; failures are reported as
//! `AppError::BackendUnavailable` by the implementations.

use crate::error::AppError;
use crate::models::{GroupRecord, Message, Nat, NoteRecord, Principal, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Backend calls made on behalf of one caller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The caller's own user record.
    async fn get_user(&self) -> Result<Option<User>, AppError>;

    async fn get_tokens(&self) -> Result<Nat, AppError>;

    async fn get_balance(&self) -> Result<Nat, AppError>;

    /// All groups, keyed by group id.
    async fn get_groups(&self) -> Result<Vec<(Nat, GroupRecord)>, AppError>;

    /// Groups the caller belongs to.
    async fn get_user_groups(&self) -> Result<Vec<(Nat, GroupRecord)>, AppError>;

    /// Notes owned by `owner`, or by the caller when `None`.
    async fn get_user_notes(&self, owner: Option<&Principal>) -> Result<Vec<NoteRecord>, AppError>;

    async fn search_notes(&self, term: &str) -> Result<Vec<NoteRecord>, AppError>;

    async fn get_user_by_username(&self, term: &str) -> Result<Option<User>, AppError>;

    async fn get_user_count(&self) -> Result<Nat, AppError>;

    async fn get_messages(&self, group_id: &Nat) -> Result<Option<Vec<Message>>, AppError>;

    async fn register_user(&self, username: &str) -> Result<bool, AppError>;

    async fn update_user(&self, username: &str) -> Result<bool, AppError>;
}

/// Produces backends acting as a given caller.
///
/// `None` connects anonymously.
pub trait BackendConnector: Send + Sync {
    fn connect(&self, caller: Option<&Principal>) -> Arc<dyn Backend>;
}
