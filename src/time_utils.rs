// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time conversion and formatting.

use chrono::{DateTime, SecondsFormat, Utc};

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Convert a provider-native nanosecond timestamp to milliseconds (truncating).
pub fn nanos_to_millis(nanos: u64) -> u64 {
    nanos / NANOS_PER_MILLI
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a millisecond timestamp as RFC3339, if it is representable.
pub fn format_millis_rfc3339(millis: u64) -> Option<String> {
    let millis = i64::try_from(millis).ok()?;
    DateTime::from_timestamp_millis(millis).map(format_utc_rfc3339)
}
