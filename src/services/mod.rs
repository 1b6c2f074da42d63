// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session, registration, aggregation and search.

pub mod aggregator;
pub mod backend;
pub mod http_backend;
pub mod http_identity;
pub mod identity;
pub mod memory;
pub mod normalize;
pub mod registration;
pub mod search;
pub mod session;

pub use aggregator::{PageHandle, ViewAggregator, ViewSettings};
pub use backend::{Backend, BackendConnector};
pub use http_backend::HttpBackendConnector;
pub use http_identity::HttpIdentityProvider;
pub use identity::{Identity, IdentityClient, IdentityProvider, LoginOptions, PrincipalIdentity};
pub use memory::{BackendMethod, InMemoryBackend};
pub use registration::{RegistrationDecision, RegistrationGate};
pub use search::SearchDispatcher;
pub use session::SessionManager;
