// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw record shapes returned by the backend service.
//!
//! These carry opaque backend types (principals, arbitrary-precision
//! integers, nanosecond timestamps) and never reach a view model directly;
//! see `services::normalize` for the conversion boundary.

use crate::error::AppError;
use crate::models::Principal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arbitrary-precision natural number, carried as its decimal digits.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "NatRepr", into = "String")]
pub struct Nat(String);

/// Wire representation: either a JSON number or a decimal string.
///
/// Integers past `u64::MAX` arrive from serde_json as floats and cannot be
/// carried exactly.
#[derive(Deserialize)]
#[serde(untagged)]
enum NatRepr {
    Number(u64),
    Inexact(f64),
    Text(String),
}

impl Nat {
    pub fn parse(digits: &str) -> Result<Self, AppError> {
        let digits = digits.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "{digits:?} is not a natural number"
            )));
        }
        let canonical = digits.trim_start_matches('0');
        Ok(Self(if canonical.is_empty() {
            "0".to_string()
        } else {
            canonical.to_string()
        }))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to the platform integer; fails rather than truncating.
    pub fn to_u64(&self) -> Result<u64, AppError> {
        self.0
            .parse()
            .map_err(|_| AppError::Validation(format!("{} does not fit in 64 bits", self.0)))
    }
}

impl From<u64> for Nat {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<NatRepr> for Nat {
    type Error = AppError;

    fn try_from(value: NatRepr) -> Result<Self, Self::Error> {
        match value {
            NatRepr::Number(n) => Ok(Self::from(n)),
            NatRepr::Inexact(n) => Err(AppError::Validation(format!(
                "{n} is not an exact natural number; send large values as strings"
            ))),
            NatRepr::Text(s) => Self::parse(&s),
        }
    }
}

impl From<Nat> for String {
    fn from(value: Nat) -> Self {
        value.0
    }
}

impl fmt::Display for Nat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Nat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nat({})", self.0)
    }
}

/// Registered user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub principal: Principal,
    pub username: String,
}

/// Study group record (the id travels alongside it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub name: String,
    pub creator: Principal,
    pub members: Vec<Principal>,
    /// Creation time in nanoseconds since the Unix epoch
    pub created_at: Nat,
}

/// Minted study note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: Nat,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub content: String,
    pub price: Nat,
    pub owner: Principal,
}

/// Group chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Principal>,
    /// Send time in nanoseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Nat>,
}
