// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder for smart-switch telemetry and command results.

use crate::decode::{field, parse_object};
use crate::types::{extract_timestamp, now_millis};
use serde_json::Value;

/// Relay state field names; multi-channel devices report `POWER1`.
const POWER_FIELDS: [&str; 2] = ["POWER", "POWER1"];

/// A decoded switch power state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchUpdate {
    /// Device key from the topic.
    pub id: String,
    /// Relay state.
    pub power: bool,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// Decodes a switch STATE/RESULT payload.
///
/// The power state comes from `POWER` or `POWER1`; the strings `"ON"`
/// and `"1"` mean on, anything else means off. A payload that is just a
/// bare `0`/`1` (no JSON structure) is accepted as a raw relay encoding.
///
/// # Examples
///
/// ```
/// use heimlink_lib::decode::decode_switch;
///
/// assert!(decode_switch("X1", r#"{"POWER":"ON"}"#).unwrap().power);
/// assert!(!decode_switch("X1", r#"{"POWER":"OFF"}"#).unwrap().power);
/// assert!(decode_switch("X1", "1").unwrap().power);
/// ```
#[must_use]
pub fn decode_switch(id: &str, payload: &str) -> Option<SwitchUpdate> {
    if let Some(obj) = parse_object(payload) {
        let power = match field(&obj, &POWER_FIELDS)? {
            Value::String(s) => power_on(s),
            Value::Number(n) => n.as_i64() == Some(1),
            Value::Bool(b) => *b,
            _ => return None,
        };
        return Some(SwitchUpdate {
            id: id.to_owned(),
            power,
            timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
        });
    }

    // Minimal firmwares publish the bare relay state.
    let power = match payload.trim() {
        "1" => true,
        "0" => false,
        _ => return None,
    };
    Some(SwitchUpdate {
        id: id.to_owned(),
        power,
        timestamp: now_millis(),
    })
}

fn power_on(value: &str) -> bool {
    matches!(value, "ON" | "1")
}
