// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Opaque identity tokens (principals) and their canonical text form.
//!
//! The text form is the lowercase base32 (RFC 4648, no padding) encoding of
//! `crc32(bytes) ++ bytes`, split into dash-separated groups of five.

use crate::error::AppError;
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_PRINCIPAL_LEN: usize = 29;
const CHECKSUM_LEN: usize = 4;
const GROUP_LEN: usize = 5;
const ANONYMOUS_TAG: u8 = 0x04;

/// An opaque, unforgeable identifier for an authenticated person.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal {
    bytes: Vec<u8>,
}

impl Principal {
    /// Wrap raw principal bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AppError> {
        if bytes.len() > MAX_PRINCIPAL_LEN {
            return Err(AppError::Validation(format!(
                "principal is {} bytes, at most {} allowed",
                bytes.len(),
                MAX_PRINCIPAL_LEN
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// The principal used by callers that have not authenticated.
    pub fn anonymous() -> Self {
        Self {
            bytes: vec![ANONYMOUS_TAG],
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.bytes == [ANONYMOUS_TAG]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Canonical text form.
    pub fn to_text(&self) -> String {
        let mut payload = Vec::with_capacity(CHECKSUM_LEN + self.bytes.len());
        payload.extend_from_slice(&crc32fast::hash(&self.bytes).to_be_bytes());
        payload.extend_from_slice(&self.bytes);

        let encoded = BASE32_NOPAD.encode(&payload).to_ascii_lowercase();
        let mut text = String::with_capacity(encoded.len() + encoded.len() / GROUP_LEN);
        for (i, c) in encoded.chars().enumerate() {
            if i > 0 && i % GROUP_LEN == 0 {
                text.push('-');
            }
            text.push(c);
        }
        text
    }

    /// Parse and verify the canonical text form.
    pub fn from_text(text: &str) -> Result<Self, AppError> {
        let invalid = |reason: &str| AppError::Validation(format!("invalid principal {text:?}: {reason}"));

        let lowered = text.trim().to_ascii_lowercase();
        let compact: String = lowered
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let payload = BASE32_NOPAD
            .decode(compact.as_bytes())
            .map_err(|_| invalid("not base32"))?;

        if payload.len() < CHECKSUM_LEN {
            return Err(invalid("too short"));
        }
        let (checksum, bytes) = payload.split_at(CHECKSUM_LEN);
        if crc32fast::hash(bytes).to_be_bytes() != checksum {
            return Err(invalid("checksum mismatch"));
        }

        let principal = Self::from_slice(bytes)?;
        if principal.to_text() != lowered {
            return Err(invalid("not in canonical form"));
        }
        Ok(principal)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.to_text())
    }
}

impl TryFrom<String> for Principal {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_text(&value)
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.to_text()
    }
}
