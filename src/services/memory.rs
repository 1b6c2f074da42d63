// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend with deterministic state.
//!
//! Used by the test-suite and benchmarks. Individual methods can be made to
//! fail or stall, and every call is counted.

use crate::error::AppError;
use crate::models::{GroupRecord, Message, Nat, NoteRecord, Principal, User};
use crate::services::backend::{Backend, BackendConnector};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Backend methods, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendMethod {
    GetUser,
    GetTokens,
    GetBalance,
    GetGroups,
    GetUserGroups,
    GetUserNotes,
    SearchNotes,
    GetUserByUsername,
    GetUserCount,
    GetMessages,
    RegisterUser,
    UpdateUser,
}

impl BackendMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendMethod::GetUser => "getUser",
            BackendMethod::GetTokens => "getTokens",
            BackendMethod::GetBalance => "getBalance",
            BackendMethod::GetGroups => "getGroups",
            BackendMethod::GetUserGroups => "getUserGroups",
            BackendMethod::GetUserNotes => "getUserNotes",
            BackendMethod::SearchNotes => "searchNotes",
            BackendMethod::GetUserByUsername => "getUserByUsername",
            BackendMethod::GetUserCount => "getUserCount",
            BackendMethod::GetMessages => "getMessages",
            BackendMethod::RegisterUser => "registerUser",
            BackendMethod::UpdateUser => "updateUser",
        }
    }
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    groups: Vec<(u64, GroupRecord)>,
    notes: Vec<NoteRecord>,
    messages: HashMap<u64, Vec<Message>>,
    tokens: HashMap<Principal, u64>,
    next_group_id: u64,
    next_note_id: u64,
}

#[derive(Default)]
struct Inner {
    state: RwLock<State>,
    faults: RwLock<HashSet<BackendMethod>>,
    delays: RwLock<HashMap<BackendMethod, Duration>>,
    calls: DashMap<BackendMethod, usize>,
}

/// Shared in-memory backend store. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Seeding ─────────────────────────────────────────────────

    pub fn add_user(&self, principal: Principal, username: &str) {
        self.inner.state.write().users.push(User {
            principal,
            username: username.to_string(),
        });
    }

    pub fn set_tokens(&self, principal: Principal, amount: u64) {
        self.inner.state.write().tokens.insert(principal, amount);
    }

    /// Add a group and return its id.
    pub fn add_group(
        &self,
        name: &str,
        creator: Principal,
        members: Vec<Principal>,
        created_at_nanos: u64,
    ) -> u64 {
        let mut state = self.inner.state.write();
        let id = state.next_group_id;
        state.next_group_id += 1;
        state.groups.push((
            id,
            GroupRecord {
                name: name.to_string(),
                creator,
                members,
                created_at: Nat::from(created_at_nanos),
            },
        ));
        id
    }

    /// Mint a note and return its id.
    pub fn add_note(&self, title: &str, subject: &str, price: u64, owner: Principal) -> u64 {
        let mut state = self.inner.state.write();
        let id = state.next_note_id;
        state.next_note_id += 1;
        state.notes.push(NoteRecord {
            id: Nat::from(id),
            title: title.to_string(),
            subject: subject.to_string(),
            content: String::new(),
            price: Nat::from(price),
            owner,
        });
        id
    }

    pub fn add_message(&self, group_id: u64, content: &str) {
        self.inner
            .state
            .write()
            .messages
            .entry(group_id)
            .or_default()
            .push(Message {
                content: content.to_string(),
                sender: None,
                timestamp: None,
            });
    }

    // ─── Fault injection ─────────────────────────────────────────

    /// Make every subsequent call to `method` fail.
    pub fn fail(&self, method: BackendMethod) {
        self.inner.faults.write().insert(method);
    }

    pub fn heal(&self, method: BackendMethod) {
        self.inner.faults.write().remove(&method);
    }

    /// Delay every subsequent call to `method`.
    pub fn stall(&self, method: BackendMethod, delay: Duration) {
        self.inner.delays.write().insert(method, delay);
    }

    /// Number of calls made to `method` so far.
    pub fn calls(&self, method: BackendMethod) -> usize {
        self.inner.calls.get(&method).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.inner.calls.iter().map(|c| *c.value()).sum()
    }

    async fn enter(&self, method: BackendMethod) -> Result<(), AppError> {
        *self.inner.calls.entry(method).or_insert(0) += 1;

        let delay = self.inner.delays.read().get(&method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.inner.faults.read().contains(&method) {
            return Err(AppError::BackendUnavailable(format!(
                "{}: injected failure",
                method.as_str()
            )));
        }
        Ok(())
    }
}

impl BackendConnector for InMemoryBackend {
    fn connect(&self, caller: Option<&Principal>) -> Arc<dyn Backend> {
        Arc::new(InMemoryAgent {
            store: self.clone(),
            caller: caller.filter(|p| !p.is_anonymous()).cloned(),
        })
    }
}

/// View of the in-memory store as one caller.
pub struct InMemoryAgent {
    store: InMemoryBackend,
    caller: Option<Principal>,
}

impl InMemoryAgent {
    fn caller_tokens(&self) -> u64 {
        self.caller
            .as_ref()
            .and_then(|p| self.store.inner.state.read().tokens.get(p).copied())
            .unwrap_or(0)
    }
}

fn to_keyed(groups: impl Iterator<Item = (u64, GroupRecord)>) -> Vec<(Nat, GroupRecord)> {
    groups.map(|(id, g)| (Nat::from(id), g)).collect()
}

#[async_trait]
impl Backend for InMemoryAgent {
    async fn get_user(&self) -> Result<Option<User>, AppError> {
        self.store.enter(BackendMethod::GetUser).await?;
        let Some(caller) = &self.caller else {
            return Ok(None);
        };
        let state = self.store.inner.state.read();
        Ok(state.users.iter().find(|u| &u.principal == caller).cloned())
    }

    async fn get_tokens(&self) -> Result<Nat, AppError> {
        self.store.enter(BackendMethod::GetTokens).await?;
        Ok(Nat::from(self.caller_tokens()))
    }

    async fn get_balance(&self) -> Result<Nat, AppError> {
        self.store.enter(BackendMethod::GetBalance).await?;
        Ok(Nat::from(self.caller_tokens()))
    }

    async fn get_groups(&self) -> Result<Vec<(Nat, GroupRecord)>, AppError> {
        self.store.enter(BackendMethod::GetGroups).await?;
        let state = self.store.inner.state.read();
        Ok(to_keyed(state.groups.iter().cloned()))
    }

    async fn get_user_groups(&self) -> Result<Vec<(Nat, GroupRecord)>, AppError> {
        self.store.enter(BackendMethod::GetUserGroups).await?;
        let Some(caller) = &self.caller else {
            return Ok(Vec::new());
        };
        let state = self.store.inner.state.read();
        Ok(to_keyed(
            state
                .groups
                .iter()
                .filter(|(_, g)| g.members.contains(caller))
                .cloned(),
        ))
    }

    async fn get_user_notes(&self, owner: Option<&Principal>) -> Result<Vec<NoteRecord>, AppError> {
        self.store.enter(BackendMethod::GetUserNotes).await?;
        let Some(owner) = owner.or(self.caller.as_ref()) else {
            return Ok(Vec::new());
        };
        let state = self.store.inner.state.read();
        Ok(state
            .notes
            .iter()
            .filter(|n| &n.owner == owner)
            .cloned()
            .collect())
    }

    async fn search_notes(&self, term: &str) -> Result<Vec<NoteRecord>, AppError> {
        self.store.enter(BackendMethod::SearchNotes).await?;
        let needle = term.to_lowercase();
        let state = self.store.inner.state.read();
        Ok(state
            .notes
            .iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle)
                    || n.subject.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn get_user_by_username(&self, term: &str) -> Result<Option<User>, AppError> {
        self.store.enter(BackendMethod::GetUserByUsername).await?;
        let needle = term.to_lowercase();
        let state = self.store.inner.state.read();
        let exact = state
            .users
            .iter()
            .find(|u| u.username.to_lowercase() == needle);
        Ok(exact
            .or_else(|| {
                state
                    .users
                    .iter()
                    .find(|u| u.username.to_lowercase().contains(&needle))
            })
            .cloned())
    }

    async fn get_user_count(&self) -> Result<Nat, AppError> {
        self.store.enter(BackendMethod::GetUserCount).await?;
        Ok(Nat::from(self.store.inner.state.read().users.len() as u64))
    }

    async fn get_messages(&self, group_id: &Nat) -> Result<Option<Vec<Message>>, AppError> {
        self.store.enter(BackendMethod::GetMessages).await?;
        let id = group_id.to_u64()?;
        let state = self.store.inner.state.read();
        if !state.groups.iter().any(|(gid, _)| *gid == id) {
            return Ok(None);
        }
        Ok(Some(state.messages.get(&id).cloned().unwrap_or_default()))
    }

    async fn register_user(&self, username: &str) -> Result<bool, AppError> {
        self.store.enter(BackendMethod::RegisterUser).await?;
        let Some(caller) = &self.caller else {
            return Ok(false);
        };
        let mut state = self.store.inner.state.write();
        let taken = state
            .users
            .iter()
            .any(|u| &u.principal == caller || u.username == username);
        if taken {
            return Ok(false);
        }
        state.users.push(User {
            principal: caller.clone(),
            username: username.to_string(),
        });
        Ok(true)
    }

    async fn update_user(&self, username: &str) -> Result<bool, AppError> {
        self.store.enter(BackendMethod::UpdateUser).await?;
        let Some(caller) = &self.caller else {
            return Ok(false);
        };
        let mut state = self.store.inner.state.write();
        if state
            .users
            .iter()
            .any(|u| u.username == username && &u.principal != caller)
        {
            return Ok(false);
        }
        match state.users.iter_mut().find(|u| &u.principal == caller) {
            Some(user) => {
                user.username = username.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
