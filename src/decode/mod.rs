// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload decoders, one per device family.
//!
//! Every decoder takes the device id (extracted from the topic by the
//! router) and the raw UTF-8 payload, and returns `Option<Update>`:
//! `None` means the message is dropped. Decoders fail soft: a parse
//! error or a missing required field never surfaces as an error, and
//! optional fields default instead of failing the whole decode.
//!
//! Firmwares disagree on field casing and sometimes encode numbers and
//! booleans as strings; the helpers here absorb that variation so the
//! per-family decoders stay declarative.

mod door;
mod energy;
mod sensor;
mod switch;
mod weather;
mod wol;

pub use door::{DoorUpdate, decode_door};
pub use energy::{EnergyUpdate, PvUpdate, decode_energy, decode_pv};
pub use sensor::{SensorUpdate, decode_sensor};
pub use switch::{SwitchUpdate, decode_switch};
pub use weather::{WeatherUpdate, decode_weather};
pub use wol::{DEFAULT_WOL_PRIORITY, WolUpdate, decode_wol};

use serde_json::{Map, Value};

/// Parses a payload into a JSON object, or `None` for anything else.
pub(crate) fn parse_object(payload: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Returns the first present field among `names`.
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

/// Returns the first present field among `names`, searching the top level
/// first and then every one-level-nested sub-object.
pub(crate) fn field_nested<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    if let Some(value) = field(obj, names) {
        return Some(value);
    }
    for value in obj.values() {
        if let Value::Object(sub) = value
            && let Some(found) = field(sub, names)
        {
            return Some(found);
        }
    }
    None
}

/// Reads a float, accepting JSON numbers and numeric strings.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn number(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Reads an integer, accepting JSON numbers and numeric strings.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a boolean, accepting JSON booleans and `"true"`/`"false"`.
pub(crate) fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Reads a string field.
pub(crate) fn string(value: &Value) -> Option<&str> {
    value.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_object_rejects_non_objects() {
        assert!(parse_object(r#"{"a":1}"#).is_some());
        assert!(parse_object("42").is_none());
        assert!(parse_object("[1,2]").is_none());
        assert!(parse_object("not json").is_none());
    }

    #[test]
    fn field_prefers_earlier_names() {
        let obj = parse_object(r#"{"temp":1,"temperature":2}"#).unwrap();
        let value = field(&obj, &["temperature", "temp"]).unwrap();
        assert_eq!(integer(value), Some(2));
    }

    #[test]
    fn field_nested_falls_through_to_sub_objects() {
        let obj = parse_object(r#"{"Time":"x","MT175":{"Power_cur":150}}"#).unwrap();
        let value = field_nested(&obj, &["Power_cur"]).unwrap();
        assert_eq!(number(value), Some(150.0));
    }

    #[test]
    fn number_accepts_numeric_strings() {
        assert_eq!(number(&json!(21.5)), Some(21.5));
        assert_eq!(number(&json!("21.5")), Some(21.5));
        assert_eq!(number(&json!("x")), None);
        assert_eq!(number(&json!(true)), None);
    }

    #[test]
    fn boolean_accepts_string_encodings() {
        assert_eq!(boolean(&json!(true)), Some(true));
        assert_eq!(boolean(&json!("true")), Some(true));
        assert_eq!(boolean(&json!("False")), Some(false));
        assert_eq!(boolean(&json!(1)), None);
    }
}
