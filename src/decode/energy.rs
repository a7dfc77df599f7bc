// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoders for the power/energy family: PV inverters and grid meters.

use crate::decode::{field_nested, number, parse_object};
use crate::types::{extract_timestamp, now_millis};

/// A decoded PV inverter reading (two strings/phases).
#[derive(Debug, Clone, PartialEq)]
pub struct PvUpdate {
    /// Inverter key from the topic.
    pub id: String,
    /// Instantaneous power, phase 1 (W).
    pub power1: f32,
    /// Instantaneous power, phase 2 (W).
    pub power2: f32,
    /// Cumulative production, phase 1 (kWh).
    pub energy1: f32,
    /// Cumulative production, phase 2 (kWh).
    pub energy2: f32,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// A decoded grid-meter reading.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyUpdate {
    /// Meter key from the topic.
    pub id: String,
    /// Instantaneous active power (W), negative when exporting.
    pub active_power: f32,
    /// Energy imported today (kWh).
    pub today_import: f32,
    /// Energy exported today (kWh).
    pub today_export: f32,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// Decodes a PV inverter payload. All four readings are required.
#[must_use]
pub fn decode_pv(id: &str, payload: &str) -> Option<PvUpdate> {
    let obj = parse_object(payload)?;
    let power1 = field_nested(&obj, &["p1", "P1"]).and_then(number)?;
    let power2 = field_nested(&obj, &["p2", "P2"]).and_then(number)?;
    let energy1 = field_nested(&obj, &["e1", "E1"]).and_then(number)?;
    let energy2 = field_nested(&obj, &["e2", "E2"]).and_then(number)?;

    Some(PvUpdate {
        id: id.to_owned(),
        power1,
        power2,
        energy1,
        energy2,
        timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
    })
}

/// Decodes a grid-meter payload. All three readings are required.
///
/// Meter-reader firmwares nest readings under the meter model name
/// (`{"Time":…,"MT175":{"Power_cur":…}}`), so fields are searched at the
/// top level and one level deep.
#[must_use]
pub fn decode_energy(id: &str, payload: &str) -> Option<EnergyUpdate> {
    let obj = parse_object(payload)?;
    let active_power =
        field_nested(&obj, &["power", "Power", "power_cur", "Power_cur"]).and_then(number)?;
    let today_import =
        field_nested(&obj, &["today_import", "Today_in", "total_in", "Total_in"]).and_then(number)?;
    let today_export = field_nested(&obj, &["today_export", "Today_out", "total_out", "Total_out"])
        .and_then(number)?;

    Some(EnergyUpdate {
        id: id.to_owned(),
        active_power,
        today_import,
        today_export,
        timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
    })
}
