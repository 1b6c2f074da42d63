// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Remote collaborators ---
    /// Base URL of the backend gateway
    pub backend_url: String,
    /// Identity provider used for the login ceremony
    pub identity_provider_url: String,
    /// Frontend URL (CORS origin of the rendering layer)
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- View tuning ---
    /// Number of featured groups on the home page
    pub featured_group_count: usize,
    /// Number of the person's most recent notes on the home page
    pub recent_note_count: usize,
    /// Number of announcement messages on the home page
    pub announcement_count: usize,
    /// Lowercase keywords marking a group as the announcement channel
    pub announcement_keywords: Vec<String>,
    /// Longest username accepted by registration and username updates
    pub max_username_len: usize,

    // --- Browsing contexts ---
    /// Seconds without a request before a browsing context is dropped
    pub context_idle_secs: u64,
    /// Most browsing contexts held at once
    pub max_contexts: usize,
}

const DEFAULT_IDENTITY_PROVIDER_URL: &str = "https://identity.ic0.app";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

impl Config {
    /// Config for tests: in-process collaborators, default view tuning.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://localhost:4943".to_string(),
            identity_provider_url: DEFAULT_IDENTITY_PROVIDER_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            port: 8080,
            featured_group_count: 4,
            recent_note_count: 6,
            announcement_count: 3,
            announcement_keywords: vec!["announcement".to_string(), "public".to_string()],
            max_username_len: 32,
            context_idle_secs: 30 * 60,
            max_contexts: 10_000,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::test_default();

        Ok(Self {
            backend_url: env::var("BACKEND_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_URL"))?,
            identity_provider_url: env::var("IDENTITY_PROVIDER_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_PROVIDER_URL.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string()),
            port: parse_or("PORT", defaults.port)?,
            featured_group_count: parse_or("FEATURED_GROUP_COUNT", defaults.featured_group_count)?,
            recent_note_count: parse_or("RECENT_NOTE_COUNT", defaults.recent_note_count)?,
            announcement_count: parse_or("ANNOUNCEMENT_COUNT", defaults.announcement_count)?,
            announcement_keywords: env::var("ANNOUNCEMENT_KEYWORDS")
                .map(|v| parse_keywords(&v))
                .unwrap_or(defaults.announcement_keywords),
            max_username_len: parse_or("MAX_USERNAME_LEN", defaults.max_username_len)?,
            context_idle_secs: parse_or("CONTEXT_IDLE_SECS", defaults.context_idle_secs)?,
            max_contexts: parse_or("MAX_CONTEXTS", defaults.max_contexts)?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Split a comma separated keyword list, lowercased, blanks dropped.
fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
