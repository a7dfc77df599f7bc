// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timestamp extraction from device telemetry.
//!
//! Home-automation firmwares stamp their messages in wildly different
//! formats, under different field names, or not at all. This module scans
//! a fixed list of candidate fields and tries a fixed list of date-time
//! patterns; the first successful parse wins. Decoders fall back to the
//! time of message receipt when nothing parses, so a timestamp is never
//! the reason a message is dropped.
//!
//! # Supported Formats
//!
//! - RFC 3339 / ISO 8601 with timezone: `"2024-01-01T10:00:00Z"`,
//!   `"2024-01-01T10:00:00.123+01:00"`
//! - ISO 8601 without timezone (interpreted as UTC): `"2024-01-01T10:00:00"`
//! - Space- and slash-separated variants: `"2024-01-01 10:00:00"`,
//!   `"2024/01/01 10:00:00"`
//! - Day-first variants: `"10:00:00 01.01.2024"`, `"01.01.2024 10:00:00"`
//! - Unix epoch: seconds below 10,000,000,000, milliseconds at or above
//!
//! # Examples
//!
//! ```
//! use heimlink_lib::types::parse_timestamp;
//!
//! assert_eq!(parse_timestamp("2024-01-01T10:00:00Z"), Some(1_704_103_200_000));
//! assert_eq!(parse_timestamp("1704103200"), Some(1_704_103_200_000));
//! assert_eq!(parse_timestamp("not a date"), None);
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Candidate field names scanned for a message timestamp, in order.
const TIME_FIELDS: [&str; 4] = ["time", "Time", "timestamp", "ts"];

/// Date-time patterns without timezone, tried after RFC 3339 and
/// interpreted as UTC.
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%H:%M:%S %d.%m.%Y",
    "%d.%m.%Y %H:%M:%S",
];

/// Epoch values below this are seconds, at or above are milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Parses a timestamp string into epoch milliseconds (UTC).
///
/// Tries, in order: RFC 3339, the naive patterns in [`NAIVE_FORMATS`],
/// and finally a bare integer interpreted as epoch seconds or
/// milliseconds depending on magnitude.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    for fmt in &NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    raw.parse::<i64>().ok().and_then(epoch_millis)
}

/// Scans a decoded JSON object for a timestamp, in [`TIME_FIELDS`] order.
///
/// A field that is present but unparseable does not stop the scan; the
/// next candidate is tried. Returns `None` when no candidate parses.
#[must_use]
pub fn extract_timestamp(obj: &Map<String, Value>) -> Option<i64> {
    for name in &TIME_FIELDS {
        match obj.get(*name) {
            Some(Value::String(raw)) => {
                if let Some(millis) = parse_timestamp(raw) {
                    return Some(millis);
                }
            }
            Some(Value::Number(n)) => {
                if let Some(millis) = n.as_i64().and_then(epoch_millis) {
                    return Some(millis);
                }
            }
            _ => {}
        }
    }
    None
}

/// Returns the current time as epoch milliseconds, the receipt-time
/// fallback used by every decoder.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Normalizes a raw epoch integer to milliseconds.
///
/// Seconds until the year 2286 have at most 10 digits, so values below
/// 10,000,000,000 are seconds and anything at or above is already
/// milliseconds. Negative values (before 1970) are rejected.
fn epoch_millis(raw: i64) -> Option<i64> {
    if raw < 0 {
        return None;
    }
    if raw < EPOCH_MILLIS_THRESHOLD {
        Some(raw * 1000)
    } else {
        Some(raw)
    }
}
