// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder for door and lock portal messages.

use crate::decode::integer;
use crate::types::{DoorState, extract_timestamp, now_millis};
use serde_json::Value;

/// A decoded door or lock portal update.
#[derive(Debug, Clone, PartialEq)]
pub struct DoorUpdate {
    /// Portal key, e.g. `"HD"` for the house door.
    pub id: String,
    /// The reported portal state.
    pub state: DoorState,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// Decodes a portal payload.
///
/// The strict path reads a numeric `state` field from a JSON object:
/// `0` is open, `1` is closed, anything else drops the message. Payloads
/// that are not well-formed objects go through a loose scan that
/// recognizes the substrings `"state":0` / `"state":1` after whitespace
/// removal. Constrained portal controllers occasionally emit JSON with
/// unbalanced braces.
///
/// # Examples
///
/// ```
/// use heimlink_lib::decode::decode_door;
/// use heimlink_lib::DoorState;
///
/// let update = decode_door("HD", r#"{"state":0}"#).unwrap();
/// assert_eq!(update.state, DoorState::Open);
///
/// assert!(decode_door("HD", r#"{"state":3}"#).is_none());
/// ```
#[must_use]
pub fn decode_door(id: &str, payload: &str) -> Option<DoorUpdate> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(obj)) => match obj.get("state").and_then(integer) {
            Some(code) => DoorState::from_code(code).map(|state| DoorUpdate {
                id: id.to_owned(),
                state,
                timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
            }),
            None => decode_loose(id, payload),
        },
        _ => decode_loose(id, payload),
    }
}

/// Substring fallback for payloads the JSON parser rejects.
fn decode_loose(id: &str, payload: &str) -> Option<DoorUpdate> {
    let compact: String = payload.split_whitespace().collect();
    let state = if compact.contains("\"state\":0") {
        DoorState::Open
    } else if compact.contains("\"state\":1") {
        DoorState::Closed
    } else {
        return None;
    };
    Some(DoorUpdate {
        id: id.to_owned(),
        state,
        timestamp: now_millis(),
    })
}
