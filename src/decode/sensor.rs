// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder for generic temperature/humidity sensors.

use crate::decode::{field, number, parse_object};
use crate::types::{extract_timestamp, now_millis};
use serde_json::Value;

/// Temperature field names, in preference order.
const TEMPERATURE_FIELDS: [&str; 3] = ["temperature", "temp", "Temperature"];

/// Humidity field names, in preference order.
const HUMIDITY_FIELDS: [&str; 2] = ["humidity", "Humidity"];

/// A decoded temperature/humidity reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    /// Sensor key from the topic.
    pub id: String,
    /// Temperature in the sensor's configured unit.
    pub temperature: f32,
    /// Relative humidity (0-100%), 0 when the sensor reports none.
    pub humidity: f32,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// Decodes a generic sensor reading.
///
/// Temperature is required and may sit at the top level or inside a
/// one-level-nested sensor block (DS18B20-style firmwares nest readings
/// under the chip name). Humidity is optional and preferred from the same
/// block the temperature came from.
#[must_use]
pub fn decode_sensor(id: &str, payload: &str) -> Option<SensorUpdate> {
    let obj = parse_object(payload)?;

    let (temperature, block) = if let Some(t) = field(&obj, &TEMPERATURE_FIELDS).and_then(number) {
        (t, None)
    } else {
        obj.values().find_map(|value| {
            if let Value::Object(sub) = value {
                field(sub, &TEMPERATURE_FIELDS)
                    .and_then(number)
                    .map(|t| (t, Some(sub)))
            } else {
                None
            }
        })?
    };

    let humidity = block
        .and_then(|sub| field(sub, &HUMIDITY_FIELDS))
        .or_else(|| field(&obj, &HUMIDITY_FIELDS))
        .and_then(number)
        .unwrap_or(0.0);

    Some(SensorUpdate {
        id: id.to_owned(),
        temperature,
        humidity,
        timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
    })
}
