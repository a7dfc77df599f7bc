// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `HeimLink` Lib - A Rust library to monitor and control home-automation
//! devices via MQTT.
//!
//! This library is the protocol core of a home-automation front end: it
//! maintains a single broker session, subscribes to a fixed set of topic
//! patterns, decodes heterogeneous device payloads into typed updates,
//! and publishes user commands. Everything it learns is delivered
//! through callbacks; nothing is polled.
//!
//! # Supported Device Families
//!
//! - **Door/lock portals**: garage and house doors with numeric state payloads
//! - **Wake-on-LAN hosts**: liveness announcements, wake and shutdown commands
//! - **Sensors**: generic temperature/humidity and weather stations
//! - **Power/energy**: PV inverters and grid meters
//! - **Smart switches**: Tasmota-style STATE/RESULT telemetry and POWER commands
//!
//! # Failure Model
//!
//! Nothing escapes the bridge as an error at runtime: transport failures
//! become connection-state transitions, undecodable payloads are dropped
//! per message, and publishes while disconnected are silently skipped.
//! The two observable channels are the connection state and the update
//! callbacks.
//!
//! # Quick Start
//!
//! ```no_run
//! use heimlink_lib::{MqttBridge, WolAction};
//!
//! #[tokio::main]
//! async fn main() -> heimlink_lib::Result<()> {
//!     let bridge = MqttBridge::builder()
//!         .url("ws://192.168.22.5:1884")
//!         .on_connection_changed(|state| println!("connection: {state}"))
//!         .on_door_update(|update| println!("{}: {}", update.id, update.state))
//!         .on_switch_update(|update| println!("{}: {}", update.id, update.power))
//!         .build()?;
//!
//!     bridge.connect().await;
//!
//!     // Fire-and-forget commands; no-ops while disconnected
//!     bridge.toggle_door("G").await;
//!     bridge.wol_action("aa:bb:cc:dd:ee:ff", WolAction::Wake).await;
//!     bridge.set_power("tasmota_BDC5E0", true).await;
//!
//!     bridge.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Threading
//!
//! Update and connection-state callbacks run on the bridge's session
//! task, never on the caller's thread. `reconnect()` runs its
//! close+reopen sequence on a spawned task, so it is safe to call from
//! UI event handlers.

pub mod command;
pub mod decode;
pub mod error;
pub mod protocol;
pub mod subscription;
pub mod types;

pub use command::WolAction;
pub use decode::{
    DoorUpdate, EnergyUpdate, PvUpdate, SensorUpdate, SwitchUpdate, WeatherUpdate, WolUpdate,
};
pub use error::{Error, ProtocolError, Result};
pub use protocol::{BridgeConfig, Family, MqttBridge, MqttBridgeBuilder, TopicConfig, TopicRouter};
pub use subscription::{CallbackRegistry, SubscriptionId};
pub use types::{ConnectionState, DoorState};
