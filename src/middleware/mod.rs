// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (browsing context, security headers).

pub mod context;
pub mod security;

pub use context::{attach_context, CurrentContext, CONTEXT_COOKIE};
