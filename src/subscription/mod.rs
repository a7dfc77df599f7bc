// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for connection-state and device-update callbacks.
//!
//! The bridge delivers everything it decodes through callbacks: one
//! channel for connection-state transitions and one per device family.
//! Callbacks run on the bridge's session task, so callers must treat
//! them as occurring off their main/UI thread.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches updates
//!
//! Callbacks are typically registered through the builder:
//!
//! ```no_run
//! use heimlink_lib::MqttBridge;
//!
//! # fn example() -> heimlink_lib::Result<()> {
//! let bridge = MqttBridge::builder()
//!     .url("ws://192.168.22.5:1884")
//!     .on_door_update(|update| println!("{}: {}", update.id, update.state))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! Additional callbacks can be registered later through
//! [`crate::MqttBridge::callbacks`].

mod callback;

pub use callback::{CallbackRegistry, SubscriptionId};
