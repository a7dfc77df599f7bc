// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic classification and inbound message routing.
//!
//! The router holds an ordered list of `{pattern, family}` routes built
//! from the [`TopicConfig`]. Each inbound topic is tested against the
//! routes in order; the first match strips the family's prefix and suffix
//! to obtain the device id and hands the payload to that family's
//! decoder. A topic matching no route is silently dropped.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: muh/portal/HD/json → {"state":0}
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!     First matching route: Family::Door, id "HD"
//!                     ↓
//!           decode_door("HD", payload)
//!                     ↓
//!           callbacks.dispatch_door(update)
//! ```

use crate::decode::{
    decode_door, decode_energy, decode_pv, decode_sensor, decode_switch, decode_weather, decode_wol,
};
use crate::subscription::CallbackRegistry;

/// Topic namespace configuration.
///
/// Defaults match the reference deployment: a `muh/` namespace for the
/// portal, host, sensor, weather and PV families, plus the standard
/// Tasmota `tele`/`stat`/`cmnd` prefixes for switches and meters.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Prefix for door/lock portal topics.
    pub portal_prefix: String,
    /// Prefix for wake-on-LAN host announcements.
    pub pc_prefix: String,
    /// Prefix for generic sensor topics (multi-level).
    pub sensors_prefix: String,
    /// Prefix for weather-station topics.
    pub weather_prefix: String,
    /// Prefix for PV inverter topics.
    pub pv_prefix: String,
    /// Tasmota telemetry prefix.
    pub tele_prefix: String,
    /// Tasmota command-result prefix.
    pub stat_prefix: String,
    /// Tasmota command prefix.
    pub cmnd_prefix: String,
    /// Fixed topic for door toggle/lock command tokens.
    pub door_command_topic: String,
    /// Fixed topic for wake commands.
    pub wol_wake_topic: String,
    /// Fixed topic for shutdown commands.
    pub wol_shutdown_topic: String,
    /// Known portal keys and their display names.
    pub portals: Vec<(String, String)>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        let portals = [
            ("G", "Garage"),
            ("GD", "Garage Door"),
            ("GDL", "Garage Door Lock"),
            ("HD", "House Door"),
            ("HDL", "House Door Lock"),
        ];
        Self {
            portal_prefix: "muh/portal".to_string(),
            pc_prefix: "muh/pc".to_string(),
            sensors_prefix: "muh/sensors".to_string(),
            weather_prefix: "muh/wst".to_string(),
            pv_prefix: "muh/pv".to_string(),
            tele_prefix: "tele".to_string(),
            stat_prefix: "stat".to_string(),
            cmnd_prefix: "cmnd".to_string(),
            door_command_topic: "muh/portal/RLY/cmnd".to_string(),
            wol_wake_topic: "muh/wol/wake".to_string(),
            wol_shutdown_topic: "muh/wol/shutdown".to_string(),
            portals: portals
                .iter()
                .map(|(k, n)| ((*k).to_string(), (*n).to_string()))
                .collect(),
        }
    }
}

impl TopicConfig {
    /// Returns the wildcard patterns subscribed at every CONNACK.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            format!("{}/+/json", self.portal_prefix),
            format!("{}/+", self.pc_prefix),
            format!("{}/#", self.sensors_prefix),
            format!("{}/+", self.weather_prefix),
            format!("{}/+/json", self.pv_prefix),
            format!("{}/+/STATE", self.tele_prefix),
            format!("{}/+/SENSOR", self.tele_prefix),
            format!("{}/+/RESULT", self.stat_prefix),
        ]
    }

    /// Returns the set-power command topic for a device.
    #[must_use]
    pub fn power_command_topic(&self, device_id: &str) -> String {
        format!("{}/{}/POWER", self.cmnd_prefix, device_id)
    }

    /// Returns the display name for a portal key, or the key itself when
    /// it is not registered.
    #[must_use]
    pub fn portal_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.portals
            .iter()
            .find(|(k, _)| k == key)
            .map_or(key, |(_, name)| name.as_str())
    }

    /// Returns the registered portal keys in display order.
    #[must_use]
    pub fn portal_keys(&self) -> Vec<&str> {
        self.portals.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Device family a topic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Door/lock portals.
    Door,
    /// Wake-on-LAN hosts.
    Wol,
    /// Generic temperature/humidity sensors.
    Sensor,
    /// Weather stations.
    Weather,
    /// PV inverters.
    Pv,
    /// Smart switches.
    Switch,
    /// Grid meters.
    Energy,
}

/// How a route treats its suffix segment.
#[derive(Debug, Clone, Copy)]
enum Suffix {
    /// The suffix must be present.
    Required(&'static str),
    /// The suffix is stripped when present, tolerated when absent.
    Optional(&'static str),
}

/// One entry of the ordered routing table.
#[derive(Debug)]
struct Route {
    /// Topic prefix including the trailing separator.
    prefix: String,
    suffix: Suffix,
    /// Whether the id may span multiple topic levels (`#` subscriptions).
    multi_level: bool,
    family: Family,
}

impl Route {
    fn new(prefix: &str, suffix: Suffix, multi_level: bool, family: Family) -> Self {
        Self {
            prefix: format!("{prefix}/"),
            suffix,
            multi_level,
            family,
        }
    }

    /// Extracts the device id when the topic matches this route.
    fn device_id<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = topic.strip_prefix(self.prefix.as_str())?;
        let id = match self.suffix {
            Suffix::Required(suffix) => rest.strip_suffix(suffix)?,
            Suffix::Optional(suffix) => rest.strip_suffix(suffix).unwrap_or(rest),
        };
        if id.is_empty() || (!self.multi_level && id.contains('/')) {
            return None;
        }
        Some(id)
    }
}

/// Routes inbound MQTT messages to the family decoders and callbacks.
#[derive(Debug)]
pub struct TopicRouter {
    routes: Vec<Route>,
}

impl TopicRouter {
    /// Builds the routing table for a topic configuration.
    ///
    /// Route order is fixed; the first match wins. Optional `/json`
    /// suffixes are tolerated on the id-bearing families because not
    /// every firmware revision appends the segment.
    #[must_use]
    pub fn new(config: &TopicConfig) -> Self {
        let routes = vec![
            Route::new(
                &config.portal_prefix,
                Suffix::Optional("/json"),
                false,
                Family::Door,
            ),
            Route::new(
                &config.pv_prefix,
                Suffix::Optional("/json"),
                false,
                Family::Pv,
            ),
            Route::new(
                &config.pc_prefix,
                Suffix::Optional("/json"),
                false,
                Family::Wol,
            ),
            Route::new(
                &config.weather_prefix,
                Suffix::Optional("/json"),
                false,
                Family::Weather,
            ),
            Route::new(
                &config.tele_prefix,
                Suffix::Required("/STATE"),
                false,
                Family::Switch,
            ),
            Route::new(
                &config.tele_prefix,
                Suffix::Required("/SENSOR"),
                false,
                Family::Energy,
            ),
            Route::new(
                &config.stat_prefix,
                Suffix::Required("/RESULT"),
                false,
                Family::Switch,
            ),
            Route::new(
                &config.sensors_prefix,
                Suffix::Optional("/json"),
                true,
                Family::Sensor,
            ),
        ];
        Self { routes }
    }

    /// Classifies a topic into a family and device id.
    ///
    /// Returns `None` for topics outside every configured family.
    #[must_use]
    pub fn classify<'a>(&self, topic: &'a str) -> Option<(Family, &'a str)> {
        self.routes
            .iter()
            .find_map(|route| route.device_id(topic).map(|id| (route.family, id)))
    }

    /// Decodes a message and dispatches the update to the registry.
    ///
    /// Returns `true` when an update was dispatched. Unmatched topics and
    /// undecodable payloads are dropped silently (trace-level log only).
    pub fn route(&self, topic: &str, payload: &str, callbacks: &CallbackRegistry) -> bool {
        let Some((family, id)) = self.classify(topic) else {
            tracing::trace!(topic = %topic, "Ignoring unrouted topic");
            return false;
        };

        let dispatched = match family {
            Family::Door => decode_door(id, payload)
                .map(|update| callbacks.dispatch_door(&update))
                .is_some(),
            Family::Wol => decode_wol(id, payload)
                .map(|update| callbacks.dispatch_wol(&update))
                .is_some(),
            Family::Sensor => decode_sensor(id, payload)
                .map(|update| callbacks.dispatch_sensor(&update))
                .is_some(),
            Family::Weather => decode_weather(id, payload)
                .map(|update| callbacks.dispatch_weather(&update))
                .is_some(),
            Family::Pv => decode_pv(id, payload)
                .map(|update| callbacks.dispatch_pv(&update))
                .is_some(),
            Family::Switch => decode_switch(id, payload)
                .map(|update| callbacks.dispatch_switch(&update))
                .is_some(),
            Family::Energy => decode_energy(id, payload)
                .map(|update| callbacks.dispatch_energy(&update))
                .is_some(),
        };

        if dispatched {
            tracing::debug!(topic = %topic, family = ?family, device = %id, "Dispatched update");
        } else {
            tracing::trace!(topic = %topic, family = ?family, "Dropping undecodable payload");
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DoorState;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn router() -> TopicRouter {
        TopicRouter::new(&TopicConfig::default())
    }

    #[test]
    fn classify_extracts_family_and_id() {
        let router = router();
        assert_eq!(
            router.classify("muh/portal/HD/json"),
            Some((Family::Door, "HD"))
        );
        assert_eq!(router.classify("muh/pc/nas"), Some((Family::Wol, "nas")));
        assert_eq!(
            router.classify("muh/sensors/87"),
            Some((Family::Sensor, "87"))
        );
        assert_eq!(
            router.classify("muh/wst/ws1"),
            Some((Family::Weather, "ws1"))
        );
        assert_eq!(
            router.classify("muh/pv/E07000055917/json"),
            Some((Family::Pv, "E07000055917"))
        );
        assert_eq!(
            router.classify("tele/tasmota_BDC5E0/STATE"),
            Some((Family::Switch, "tasmota_BDC5E0"))
        );
        assert_eq!(
            router.classify("stat/tasmota_BDC5E0/RESULT"),
            Some((Family::Switch, "tasmota_BDC5E0"))
        );
        assert_eq!(
            router.classify("tele/tasmota_5FF8B2/SENSOR"),
            Some((Family::Energy, "tasmota_5FF8B2"))
        );
    }

    #[test]
    fn optional_json_suffix_is_tolerated() {
        let router = router();
        assert_eq!(router.classify("muh/portal/HD"), Some((Family::Door, "HD")));
        assert_eq!(
            router.classify("muh/pc/nas/json"),
            Some((Family::Wol, "nas"))
        );
    }

    #[test]
    fn multi_level_sensor_ids_are_allowed() {
        let router = router();
        assert_eq!(
            router.classify("muh/sensors/attic/87"),
            Some((Family::Sensor, "attic/87"))
        );
    }

    #[test]
    fn unknown_topics_do_not_classify() {
        let router = router();
        assert_eq!(router.classify("other/topic"), None);
        assert_eq!(router.classify("tele/x/LWT"), None);
        assert_eq!(router.classify("muh/portal"), None);
        assert_eq!(router.classify("muh/portal/"), None);
    }

    #[test]
    fn multi_segment_ids_are_rejected_on_single_level_routes() {
        let router = router();
        assert_eq!(router.classify("tele/a/b/STATE"), None);
        assert_eq!(router.classify("muh/portal/a/b/json"), None);
    }

    #[test]
    fn route_dispatches_door_update() {
        let router = router();
        let callbacks = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        callbacks.on_door_update(move |update| s.lock().push(update.clone()));

        let routed = router.route(
            "muh/portal/HD/json",
            r#"{"state":0,"time":"2024-01-01T10:00:00Z"}"#,
            &callbacks,
        );
        assert!(routed);

        let updates = seen.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "HD");
        assert_eq!(updates[0].state, DoorState::Open);
        assert_eq!(updates[0].timestamp, 1_704_103_200_000);
    }

    #[test]
    fn route_dispatches_switch_update() {
        let router = router();
        let callbacks = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        callbacks.on_switch_update(move |update| s.lock().push(update.clone()));

        assert!(router.route("tele/X1/STATE", r#"{"POWER":"ON"}"#, &callbacks));

        let updates = seen.lock();
        assert_eq!(updates[0].id, "X1");
        assert!(updates[0].power);
    }

    #[test]
    fn route_defaults_missing_timestamp_to_receipt_time() {
        let router = router();
        let callbacks = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        callbacks.on_door_update(move |update| s.lock().push(update.clone()));

        let before = crate::types::now_millis();
        assert!(router.route("muh/portal/HD/json", r#"{"state":0}"#, &callbacks));
        let after = crate::types::now_millis();

        let updates = seen.lock();
        assert!(updates[0].timestamp >= before && updates[0].timestamp <= after);
    }

    #[test]
    fn unmatched_topic_reaches_no_callback() {
        let router = router();
        let callbacks = CallbackRegistry::new();
        let count = Arc::new(AtomicU32::new(0));
        for family in 0..7 {
            let c = count.clone();
            match family {
                0 => callbacks.on_door_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                1 => callbacks.on_wol_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                2 => callbacks.on_sensor_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                3 => callbacks.on_weather_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                4 => callbacks.on_switch_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                5 => callbacks.on_pv_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                _ => callbacks.on_energy_update(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
            };
        }

        assert!(!router.route("zigbee2mqtt/0x00158d0001", r#"{"state":0}"#, &callbacks));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undecodable_payload_is_dropped() {
        let router = router();
        let callbacks = CallbackRegistry::new();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        callbacks.on_door_update(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!router.route("muh/portal/HD/json", r#"{"state":7}"#, &callbacks));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn custom_prefixes_rebuild_the_table() {
        let config = TopicConfig {
            portal_prefix: "home/doors".to_string(),
            ..TopicConfig::default()
        };
        let router = TopicRouter::new(&config);
        assert_eq!(
            router.classify("home/doors/HD/json"),
            Some((Family::Door, "HD"))
        );
        assert_eq!(router.classify("muh/portal/HD/json"), None);
    }

    #[test]
    fn config_command_topics() {
        let config = TopicConfig::default();
        assert_eq!(
            config.power_command_topic("tasmota_BDC5E0"),
            "cmnd/tasmota_BDC5E0/POWER"
        );
        assert_eq!(config.door_command_topic, "muh/portal/RLY/cmnd");
    }

    #[test]
    fn config_portal_registry() {
        let config = TopicConfig::default();
        assert_eq!(config.portal_name("HD"), "House Door");
        assert_eq!(config.portal_name("nope"), "nope");
        assert_eq!(config.portal_keys(), vec!["G", "GD", "GDL", "HD", "HDL"]);
    }

    #[test]
    fn subscription_list_covers_every_family() {
        let subs = TopicConfig::default().subscriptions();
        assert_eq!(subs.len(), 8);
        assert!(subs.contains(&"muh/portal/+/json".to_string()));
        assert!(subs.contains(&"muh/pc/+".to_string()));
        assert!(subs.contains(&"muh/sensors/#".to_string()));
        assert!(subs.contains(&"muh/wst/+".to_string()));
        assert!(subs.contains(&"muh/pv/+/json".to_string()));
        assert!(subs.contains(&"tele/+/STATE".to_string()));
        assert!(subs.contains(&"tele/+/SENSOR".to_string()));
        assert!(subs.contains(&"stat/+/RESULT".to_string()));
    }
}
