// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder for weather-station sensors.

use crate::decode::{field, number, parse_object};
use crate::types::{extract_timestamp, now_millis};

/// Weather stations report under their own field names, distinct from the
/// generic sensor family.
const TEMPERATURE_FIELDS: [&str; 2] = ["tempc", "temp_c"];
const HUMIDITY_FIELDS: [&str; 2] = ["hum", "humrel"];

/// A decoded weather-station reading.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherUpdate {
    /// Station key from the topic.
    pub id: String,
    /// Outdoor temperature in °C.
    pub temperature: f32,
    /// Relative humidity (0-100%), 0 when absent.
    pub humidity: f32,
    /// Epoch milliseconds, from the payload or the time of receipt.
    pub timestamp: i64,
}

/// Decodes a weather-station reading. Absent temperature drops the
/// message; humidity defaults to 0.
#[must_use]
pub fn decode_weather(id: &str, payload: &str) -> Option<WeatherUpdate> {
    let obj = parse_object(payload)?;
    let temperature = field(&obj, &TEMPERATURE_FIELDS).and_then(number)?;
    let humidity = field(&obj, &HUMIDITY_FIELDS)
        .and_then(number)
        .unwrap_or(0.0);

    Some(WeatherUpdate {
        id: id.to_owned(),
        temperature,
        humidity,
        timestamp: extract_timestamp(&obj).unwrap_or_else(now_millis),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_fields_decode() {
        let update = decode_weather("ws1", r#"{"tempc":3.4,"hum":81}"#).unwrap();
        assert_eq!(update.temperature, 3.4);
        assert_eq!(update.humidity, 81.0);
    }

    #[test]
    fn alternate_field_names_decode() {
        let update = decode_weather("ws1", r#"{"temp_c":-2.0,"humrel":93}"#).unwrap();
        assert_eq!(update.temperature, -2.0);
        assert_eq!(update.humidity, 93.0);
    }

    #[test]
    fn humidity_defaults_to_zero() {
        let update = decode_weather("ws1", r#"{"tempc":3.4}"#).unwrap();
        assert_eq!(update.humidity, 0.0);
    }

    #[test]
    fn generic_sensor_fields_do_not_decode_here() {
        // The weather family deliberately ignores the generic names.
        assert!(decode_weather("ws1", r#"{"temperature":3.4}"#).is_none());
    }

    #[test]
    fn missing_temperature_drops_the_message() {
        assert!(decode_weather("ws1", r#"{"hum":81}"#).is_none());
        assert!(decode_weather("ws1", "garbage").is_none());
    }

    #[test]
    fn payload_timestamp_is_used() {
        let update = decode_weather("ws1", r#"{"tempc":3.4,"time":"1704103200"}"#).unwrap();
        assert_eq!(update.timestamp, 1_704_103_200_000);
    }
}
