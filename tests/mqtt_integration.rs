// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the bridge lifecycle using mockforge-mqtt.

use std::sync::Arc;
use std::time::Duration;

use heimlink_lib::{ConnectionState, MqttBridge, WolAction};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use parking_lot::Mutex;
use tokio::time::sleep;

type StateLog = Arc<Mutex<Vec<ConnectionState>>>;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

/// Builds a bridge against a local broker port, recording every
/// connection-state transition.
fn build_bridge(port: u16) -> (MqttBridge, StateLog) {
    let states: StateLog = Arc::new(Mutex::new(Vec::new()));
    let log = states.clone();
    let bridge = MqttBridge::builder()
        .url(format!("mqtt://127.0.0.1:{port}"))
        .connection_timeout(Duration::from_secs(5))
        .on_connection_changed(move |state| log.lock().push(state))
        .build()
        .expect("bridge builds");
    (bridge, states)
}

/// Polls until the predicate holds or the timeout elapses.
async fn wait_until<F: Fn() -> bool>(predicate: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    predicate()
}

// ============================================================================
// Connection Lifecycle Tests
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn connect_emits_connecting_then_connected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, states) = build_bridge(port);
        bridge.connect().await;

        let connected = wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await;
        assert!(connected, "bridge never reached CONNECTED");

        let log = states.lock().clone();
        assert_eq!(log.first(), Some(&ConnectionState::Connecting));
        assert!(log.contains(&ConnectionState::Connected));
    }

    #[tokio::test]
    async fn connect_to_closed_port_reports_disconnected() {
        // Nothing listens on port 1
        let states: StateLog = Arc::new(Mutex::new(Vec::new()));
        let log = states.clone();
        let bridge = MqttBridge::builder()
            .url("mqtt://127.0.0.1:1")
            .connection_timeout(Duration::from_secs(2))
            .on_connection_changed(move |state| log.lock().push(state))
            .build()
            .expect("bridge builds");

        bridge.connect().await;

        let settled = wait_until(
            || {
                states
                    .lock()
                    .last()
                    .is_some_and(|s| *s == ConnectionState::Disconnected)
            },
            Duration::from_secs(10),
        )
        .await;
        assert!(settled, "handshake failure was not reported");

        let log = states.lock().clone();
        assert_eq!(log.first(), Some(&ConnectionState::Connecting));
        assert_eq!(log.last(), Some(&ConnectionState::Disconnected));
    }

    #[tokio::test]
    async fn disconnect_reports_disconnected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, states) = build_bridge(port);
        bridge.connect().await;
        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);

        bridge.disconnect().await;
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
        assert_eq!(
            states.lock().last(),
            Some(&ConnectionState::Disconnected)
        );
    }

    #[tokio::test]
    async fn connect_twice_is_a_noop_when_connected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, states) = build_bridge(port);
        bridge.connect().await;
        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);

        let transitions_before = states.lock().len();
        bridge.connect().await;
        sleep(Duration::from_millis(200)).await;
        assert_eq!(states.lock().len(), transitions_before);
        assert!(bridge.is_connected());
    }
}

// ============================================================================
// Reconnect Tests
// ============================================================================

mod reconnect {
    use super::*;

    #[tokio::test]
    async fn reconnect_emits_connecting_first() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, states) = build_bridge(port);
        bridge.connect().await;
        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);

        let before = states.lock().len();
        bridge.reconnect();
        // The optimistic CONNECTING is recorded synchronously
        assert_eq!(states.lock().get(before), Some(&ConnectionState::Connecting));

        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);
    }

    #[tokio::test]
    async fn overlapping_reconnects_settle_on_one_terminal_state() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, states) = build_bridge(port);
        bridge.connect().await;
        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);

        bridge.reconnect();
        bridge.reconnect();

        assert!(
            wait_until(|| bridge.is_connected(), Duration::from_secs(15)).await,
            "reconnects never settled"
        );

        // Let any trailing transitions land, then check the tail is a
        // single terminal state.
        sleep(Duration::from_millis(500)).await;
        let log = states.lock().clone();
        assert_eq!(log.last(), Some(&ConnectionState::Connected));
    }

    #[tokio::test]
    async fn reconnect_from_disconnected_connects() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, states) = build_bridge(port);
        bridge.reconnect();

        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);
        assert_eq!(states.lock().first(), Some(&ConnectionState::Connecting));
    }
}

// ============================================================================
// Publish Tests
// ============================================================================

mod publish {
    use super::*;

    #[tokio::test]
    async fn publish_while_disconnected_is_a_silent_noop() {
        let (bridge, states) = build_bridge(1); // never connected

        bridge.toggle_door("G").await;
        bridge.toggle_door("HDL_O").await;
        bridge
            .wol_action("aa:bb:cc:dd:ee:ff", WolAction::Wake)
            .await;
        bridge
            .wol_action("aa:bb:cc:dd:ee:ff", WolAction::Shutdown)
            .await;
        bridge.set_power("tasmota_BDC5E0", true).await;

        // No exception, no state transition, no queued delivery
        assert!(states.lock().is_empty());
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn publish_while_connected_does_not_disturb_the_session() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (bridge, _states) = build_bridge(port);
        bridge.connect().await;
        assert!(wait_until(|| bridge.is_connected(), Duration::from_secs(10)).await);

        bridge.toggle_door("G").await;
        bridge
            .wol_action("aa:bb:cc:dd:ee:ff", WolAction::Wake)
            .await;
        bridge.set_power("tasmota_BDC5E0", false).await;

        sleep(Duration::from_millis(200)).await;
        assert!(bridge.is_connected());
    }
}
