// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire encoding of outbound commands.
//!
//! Commands are non-critical and idempotent by repetition (re-sending
//! "open" is harmless), so everything here encodes to a plain topic +
//! payload pair that the bridge publishes at QoS 0.

use serde::Serialize;
use std::fmt;

/// Intent of a wake-on-LAN command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WolAction {
    /// Send a wake frame to the host.
    Wake,
    /// Ask the host agent to shut down.
    Shutdown,
}

impl WolAction {
    /// Returns the action label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wake => "wake",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for WolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Translates a UI door key into the command token the portal relay
/// firmware interprets.
///
/// The lock keys carry an action suffix (`_O` open, `_U` unlock, `_L`
/// lock) and map onto the door relay the lock guards; the garage key
/// maps onto its toggle token. Unknown keys return `None` and the caller
/// publishes nothing.
#[must_use]
pub fn door_command_token(key: &str) -> Option<&'static str> {
    match key {
        "G" | "G_T" => Some("G_T"),
        "GDL_O" => Some("GD_O"),
        "GDL_U" => Some("GD_U"),
        "GDL_L" => Some("GD_L"),
        "HDL_O" => Some("HD_O"),
        "HDL_U" => Some("HD_U"),
        "HDL_L" => Some("HD_L"),
        _ => None,
    }
}

#[derive(Serialize)]
struct WolPayload<'a> {
    mac: &'a str,
}

/// Encodes the wake-on-LAN command payload: `{"mac":"<mac>"}`.
#[must_use]
pub fn wol_payload(mac: &str) -> String {
    serde_json::to_string(&WolPayload { mac }).unwrap_or_default()
}

/// Encodes the set-power command payload.
#[must_use]
pub const fn power_payload(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garage_keys_map_to_toggle_token() {
        assert_eq!(door_command_token("G"), Some("G_T"));
        assert_eq!(door_command_token("G_T"), Some("G_T"));
    }

    #[test]
    fn lock_keys_map_to_door_tokens() {
        assert_eq!(door_command_token("GDL_O"), Some("GD_O"));
        assert_eq!(door_command_token("GDL_U"), Some("GD_U"));
        assert_eq!(door_command_token("GDL_L"), Some("GD_L"));
        assert_eq!(door_command_token("HDL_O"), Some("HD_O"));
        assert_eq!(door_command_token("HDL_U"), Some("HD_U"));
        assert_eq!(door_command_token("HDL_L"), Some("HD_L"));
    }

    #[test]
    fn unknown_keys_map_to_nothing() {
        assert_eq!(door_command_token("GD"), None);
        assert_eq!(door_command_token("HD"), None);
        assert_eq!(door_command_token(""), None);
    }

    #[test]
    fn wol_payload_is_single_key_json() {
        assert_eq!(
            wol_payload("aa:bb:cc:dd:ee:ff"),
            r#"{"mac":"aa:bb:cc:dd:ee:ff"}"#
        );
    }

    #[test]
    fn power_payload_encoding() {
        assert_eq!(power_payload(true), "1");
        assert_eq!(power_payload(false), "0");
    }

    #[test]
    fn wol_action_labels() {
        assert_eq!(WolAction::Wake.to_string(), "wake");
        assert_eq!(WolAction::Shutdown.to_string(), "shutdown");
    }
}
