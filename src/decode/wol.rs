// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder for wake-on-LAN host announcements.

use crate::decode::{boolean, integer, parse_object, string};
use crate::types::{extract_timestamp, now_millis};

/// Display priority assigned when the announcement carries none.
///
/// 99 sorts last, so unprioritized hosts fall to the bottom of the list.
pub const DEFAULT_WOL_PRIORITY: i32 = 99;

/// A decoded wake-on-LAN host announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WolUpdate {
    /// Host key from the topic.
    pub id: String,
    /// Display name, often a FQDN.
    pub name: String,
    /// IPv4 address as reported by the host agent.
    pub ip: String,
    /// MAC address used for the wake frame.
    pub mac: String,
    /// Whether the host currently answers pings.
    pub alive: bool,
    /// Sort priority, lower first.
    pub priority: i32,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// Decodes a host announcement.
///
/// `name`, `ip`, `mac` and `alive` are required; a missing one drops the
/// message. `priority` defaults to [`DEFAULT_WOL_PRIORITY`].
#[must_use]
pub fn decode_wol(id: &str, payload: &str) -> Option<WolUpdate> {
    let obj = parse_object(payload)?;
    let name = string(obj.get("name")?)?.to_owned();
    let ip = string(obj.get("ip")?)?.to_owned();
    let mac = string(obj.get("mac")?)?.to_owned();
    let alive = boolean(obj.get("alive")?)?;
    let priority = obj
        .get("priority")
        .and_then(integer)
        .and_then(|p| i32::try_from(p).ok())
        .unwrap_or(DEFAULT_WOL_PRIORITY);

    Some(WolUpdate {
        id: id.to_owned(),
        name,
        ip,
        mac,
        alive,
        priority,
        timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
    })
}
