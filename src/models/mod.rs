// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod backend;
pub mod principal;
pub mod search;
pub mod session;
pub mod view;

pub use backend::{GroupRecord, Message, Nat, NoteRecord, User};
pub use principal::Principal;
pub use search::{ItemDetail, SearchCategory, SearchItem, SearchResult};
pub use session::{RegistrationStatus, Route, Session, SessionState};
pub use view::{
    DashboardView, FieldFailure, GroupInfo, HomeView, NoteNft, PageState, ProfileStats,
    ProfileView,
};
