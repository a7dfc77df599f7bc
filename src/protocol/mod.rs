// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT protocol plumbing: the broker session and topic routing.
//!
//! - [`MqttBridge`]: the single broker session, its lifecycle, and
//!   command publishing
//! - [`TopicRouter`]: ordered first-match-wins classification of inbound
//!   topics into device families
//! - [`TopicConfig`]: the topic namespace (subscribe patterns and
//!   command topics)

mod bridge;
mod topic_router;

pub use bridge::{BridgeConfig, MqttBridge, MqttBridgeBuilder};
pub use topic_router::{Family, TopicConfig, TopicRouter};
