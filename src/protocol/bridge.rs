// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The MQTT bridge: broker session lifecycle, inbound routing, and
//! command publishing.
//!
//! The bridge owns exactly one logical broker session. Lifecycle and
//! publish operations never return errors; transport failures become
//! connection-state transitions or log lines. See the crate docs for a
//! usage example.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use tokio::task::JoinHandle;

use crate::command::{WolAction, door_command_token, power_payload, wol_payload};
use crate::error::{Error, ProtocolError};
use crate::protocol::{TopicConfig, TopicRouter};
use crate::subscription::CallbackRegistry;
use crate::types::ConnectionState;

/// Configuration for a bridge connection.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    url: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    disconnect_timeout: Duration,
    reconnect_close_timeout: Duration,
    retry_backoff: Duration,
    topics: TopicConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            credentials: None,
            keep_alive: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(10),
            disconnect_timeout: Duration::from_secs(1),
            reconnect_close_timeout: Duration::from_secs(2),
            retry_backoff: Duration::from_secs(2),
            topics: TopicConfig::default(),
        }
    }
}

/// An open session: the publishing client and its event-loop task.
struct Session {
    client: AsyncClient,
    task: JoinHandle<()>,
}

/// A bridge between a home-automation front end and an MQTT broker.
///
/// `MqttBridge` is cheaply cloneable (via `Arc`) and can be shared across
/// tasks. It maintains at most one physical broker session; `connect`,
/// `disconnect` and `reconnect` manage that session and report progress
/// through the connection-state callback.
#[derive(Clone)]
pub struct MqttBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    router: TopicRouter,
    callbacks: Arc<CallbackRegistry>,
    /// Current connection state; written by lifecycle calls and the
    /// session task.
    state: Mutex<ConnectionState>,
    /// The single broker session, if any.
    session: tokio::sync::Mutex<Option<Session>>,
    /// Single-slot gate serializing overlapping reconnects.
    reconnect_gate: tokio::sync::Mutex<()>,
}

impl MqttBridge {
    /// Creates a new builder for configuring a bridge.
    #[must_use]
    pub fn builder() -> MqttBridgeBuilder {
        MqttBridgeBuilder::default()
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Returns whether the bridge is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns the callback registry, for registering additional
    /// subscriptions after construction.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.inner.callbacks
    }

    /// Returns the broker URL this bridge was configured with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// Returns the display name for a portal key.
    #[must_use]
    pub fn portal_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.inner.config.topics.portal_name(key)
    }

    /// Returns the configured portal keys in display order.
    #[must_use]
    pub fn portal_keys(&self) -> Vec<&str> {
        self.inner.config.topics.portal_keys()
    }

    /// Connects to the broker.
    ///
    /// No-op if already connected. Sets [`ConnectionState::Connecting`]
    /// and opens the session; the handshake continues on a background
    /// task, which reports [`ConnectionState::Connected`] on success or
    /// [`ConnectionState::Disconnected`] on failure/timeout. Never
    /// returns an error.
    pub async fn connect(&self) {
        if self.is_connected() {
            return;
        }
        self.set_state(ConnectionState::Connecting);
        self.open_session().await;
    }

    /// Disconnects from the broker.
    ///
    /// Gracefully closes the session with a bounded wait; close failures
    /// are swallowed. The state is unconditionally
    /// [`ConnectionState::Disconnected`] afterwards.
    pub async fn disconnect(&self) {
        self.close_session(self.inner.config.disconnect_timeout)
            .await;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Closes and reopens the session.
    ///
    /// Sets [`ConnectionState::Connecting`] immediately for optimistic
    /// UI feedback, then runs the close+reopen sequence on a spawned
    /// task, never on the caller's thread. Overlapping calls are
    /// serialized through a single-slot gate; at most one physical
    /// session ever exists.
    pub fn reconnect(&self) {
        self.set_state(ConnectionState::Connecting);
        let bridge = self.clone();
        tokio::spawn(async move {
            let _slot = bridge.inner.reconnect_gate.lock().await;
            bridge
                .close_session(bridge.inner.config.reconnect_close_timeout)
                .await;
            bridge.set_state(ConnectionState::Connecting);
            bridge.open_session().await;
        });
    }

    /// Publishes a door toggle/lock command token.
    ///
    /// The key is translated through the command alias table; unknown
    /// keys publish nothing. No-op while disconnected.
    pub async fn toggle_door(&self, key: &str) {
        let Some(token) = door_command_token(key) else {
            tracing::debug!(key = %key, "Unknown door command key");
            return;
        };
        let topic = self.inner.config.topics.door_command_topic.clone();
        self.publish(&topic, token).await;
    }

    /// Publishes a wake or shutdown command for a host MAC address.
    /// No-op while disconnected.
    pub async fn wol_action(&self, mac: &str, action: WolAction) {
        let topic = match action {
            WolAction::Wake => self.inner.config.topics.wol_wake_topic.clone(),
            WolAction::Shutdown => self.inner.config.topics.wol_shutdown_topic.clone(),
        };
        self.publish(&topic, wol_payload(mac)).await;
    }

    /// Publishes a set-power command for a switch. No-op while
    /// disconnected.
    pub async fn set_power(&self, device_id: &str, on: bool) {
        let topic = self.inner.config.topics.power_command_topic(device_id);
        self.publish(&topic, power_payload(on)).await;
    }

    /// Fire-and-forget publish at QoS 0. Skipped while disconnected;
    /// errors are logged and swallowed.
    async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        if !self.is_connected() {
            tracing::debug!(topic = %topic, "Skipping publish while disconnected");
            return;
        }
        let client = {
            let session = self.inner.session.lock().await;
            session.as_ref().map(|s| s.client.clone())
        };
        let Some(client) = client else {
            return;
        };
        if let Err(e) = client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(ProtocolError::Mqtt)
        {
            tracing::warn!(topic = %topic, error = %e, "MQTT publish failed");
        }
    }

    /// Opens a fresh session and spawns its event-loop task. Any stale
    /// session left behind by a failed attempt is aborted first.
    async fn open_session(&self) {
        let options = match build_mqtt_options(&self.inner.config) {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!(url = %self.inner.config.url, error = %e, "MQTT connect failed");
                self.set_state(ConnectionState::Disconnected);
                return;
            }
        };

        let mut slot = self.inner.session.lock().await;
        if let Some(old) = slot.take() {
            old.task.abort();
        }

        let (client, event_loop) = AsyncClient::new(options, 32);
        let task = tokio::spawn(run_session(self.clone(), client.clone(), event_loop));
        *slot = Some(Session { client, task });
    }

    /// Takes down the current session, if any, with a bounded wait for
    /// the graceful disconnect. Does not touch the connection state.
    async fn close_session(&self, timeout: Duration) {
        let session = self.inner.session.lock().await.take();
        if let Some(session) = session {
            match tokio::time::timeout(timeout, session.client.disconnect()).await {
                Ok(Err(e)) => tracing::debug!(error = %e, "MQTT disconnect error ignored"),
                Err(_) => tracing::debug!("MQTT disconnect timed out"),
                Ok(Ok(())) => {}
            }
            session.task.abort();
        }
    }

    /// Records a state transition and notifies subscribers. Repeated
    /// identical states are not re-announced.
    fn set_state(&self, next: ConnectionState) {
        let changed = {
            let mut current = self.inner.state.lock();
            if *current == next {
                false
            } else {
                tracing::info!(from = %current, to = %next, "Connection state changed");
                *current = next;
                true
            }
        };
        if changed {
            self.inner.callbacks.dispatch_connection(next);
        }
    }

    /// Marks the session connected and registers the family
    /// subscriptions. Subscription failures are logged, not surfaced;
    /// the session stays connected.
    async fn session_connected(&self, client: &AsyncClient) {
        self.set_state(ConnectionState::Connected);
        for pattern in self.inner.config.topics.subscriptions() {
            match client
                .subscribe(pattern.as_str(), QoS::AtMostOnce)
                .await
                .map_err(ProtocolError::Mqtt)
            {
                Ok(()) => tracing::debug!(topic = %pattern, "Subscribed"),
                Err(e) => tracing::warn!(topic = %pattern, error = %e, "MQTT subscribe failed"),
            }
        }
    }
}

impl std::fmt::Debug for MqttBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBridge")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .finish()
    }
}

/// Drives one session's event loop.
///
/// The initial handshake is bounded by the connect timeout; afterwards
/// the loop polls forever, relying on the transport's automatic
/// reconnect (re-polling after an error reconnects) and re-subscribing
/// on every CONNACK because the session is clean.
async fn run_session(bridge: MqttBridge, client: AsyncClient, mut event_loop: EventLoop) {
    let timeout = bridge.inner.config.connection_timeout;
    if let Err(e) = await_handshake(&mut event_loop, timeout).await {
        tracing::warn!(error = %e, "MQTT handshake failed");
        bridge.set_state(ConnectionState::Disconnected);
        return;
    }

    tracing::info!(url = %bridge.inner.config.url, "Connected to MQTT broker");
    bridge.session_connected(&client).await;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("MQTT session re-established");
                bridge.session_connected(&client).await;
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        bridge
                            .inner
                            .router
                            .route(&publish.topic, &payload, &bridge.inner.callbacks);
                    }
                    Err(_) => {
                        tracing::trace!(topic = %publish.topic, "Dropping non-UTF-8 payload");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the session");
                bridge.set_state(ConnectionState::Disconnected);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "MQTT connection lost");
                bridge.set_state(ConnectionState::Disconnected);
                tokio::time::sleep(bridge.inner.config.retry_backoff).await;
            }
        }
    }
}

/// Waits for the broker CONNACK, bounded by the connect timeout.
async fn await_handshake(
    event_loop: &mut EventLoop,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, event_loop.poll()).await {
            Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => return Ok(()),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ProtocolError::ConnectionFailed(e.to_string())),
            Err(_) => {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(ProtocolError::Timeout(millis));
            }
        }
    }
}

/// Builds the transport options from the bridge configuration.
fn build_mqtt_options(config: &BridgeConfig) -> Result<MqttOptions, ProtocolError> {
    let client_id = format!("heimlink-{}", uuid::Uuid::new_v4());
    let (transport, address, port) = parse_broker_url(&config.url)?;

    let mut options = MqttOptions::new(client_id, address, port);
    if let Some(transport) = transport {
        options.set_transport(transport);
    }
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);
    if let Some((username, password)) = &config.credentials {
        options.set_credentials(username, password);
    }
    Ok(options)
}

/// Parses a broker URL into a transport selection, address, and port.
///
/// `ws://` selects the websocket transport (rumqttc takes the full URL
/// as the address); `mqtt://`, `tcp://` and bare `host:port` select
/// plain TCP. `wss://` is rejected because transport security is out of
/// scope for this library.
fn parse_broker_url(url: &str) -> Result<(Option<Transport>, String, u16), ProtocolError> {
    if url.starts_with("wss://") {
        return Err(ProtocolError::InvalidAddress(
            "TLS websockets are not supported".to_string(),
        ));
    }

    if let Some(rest) = url.strip_prefix("ws://") {
        let host_part = rest.split('/').next().unwrap_or(rest);
        let port = host_part
            .rsplit_once(':')
            .and_then(|(_, p)| p.parse().ok())
            .unwrap_or(80);
        return Ok((Some(Transport::Ws), url.to_string(), port));
    }

    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);
    let (host, port) = match stripped.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| {
                ProtocolError::InvalidAddress(format!("invalid port in '{url}'"))
            })?;
            (host.to_string(), port)
        }
        None => (stripped.to_string(), 1883),
    };
    if host.is_empty() {
        return Err(ProtocolError::InvalidAddress(format!(
            "no host in '{url}'"
        )));
    }
    Ok((None, host, port))
}

/// Builder for creating an [`MqttBridge`].
///
/// # Examples
///
/// ```no_run
/// use heimlink_lib::MqttBridge;
/// use std::time::Duration;
///
/// # fn example() -> heimlink_lib::Result<()> {
/// let bridge = MqttBridge::builder()
///     .url("ws://192.168.22.5:1884")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(10))
///     .on_connection_changed(|state| println!("connection: {state}"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MqttBridgeBuilder {
    config: BridgeConfig,
    callbacks: Arc<CallbackRegistry>,
}

impl MqttBridgeBuilder {
    /// Sets the broker URL (`ws://host:port`, `mqtt://host:port`,
    /// `tcp://host:port`, or bare `host:port`). Required.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 60 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connect handshake timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the bounded wait for graceful disconnects (default: 1 second).
    #[must_use]
    pub fn disconnect_timeout(mut self, duration: Duration) -> Self {
        self.config.disconnect_timeout = duration;
        self
    }

    /// Sets the topic namespace configuration.
    #[must_use]
    pub fn topics(mut self, topics: TopicConfig) -> Self {
        self.config.topics = topics;
        self
    }

    /// Registers a connection-state callback.
    #[must_use]
    pub fn on_connection_changed<F>(self, callback: F) -> Self
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.callbacks.on_connection_changed(callback);
        self
    }

    /// Registers a door/lock portal update callback.
    #[must_use]
    pub fn on_door_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::DoorUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_door_update(callback);
        self
    }

    /// Registers a wake-on-LAN host update callback.
    #[must_use]
    pub fn on_wol_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::WolUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_wol_update(callback);
        self
    }

    /// Registers a generic sensor update callback.
    #[must_use]
    pub fn on_sensor_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::SensorUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_sensor_update(callback);
        self
    }

    /// Registers a weather-station update callback.
    #[must_use]
    pub fn on_weather_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::WeatherUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_weather_update(callback);
        self
    }

    /// Registers a switch update callback.
    #[must_use]
    pub fn on_switch_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::SwitchUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_switch_update(callback);
        self
    }

    /// Registers a PV inverter update callback.
    #[must_use]
    pub fn on_pv_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::PvUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_pv_update(callback);
        self
    }

    /// Registers a grid-meter update callback.
    #[must_use]
    pub fn on_energy_update<F>(self, callback: F) -> Self
    where
        F: Fn(&crate::decode::EnergyUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_energy_update(callback);
        self
    }

    /// Builds the bridge.
    ///
    /// Does not connect; call [`MqttBridge::connect`] explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when the URL is missing,
    /// or [`ProtocolError::InvalidAddress`] when it is unusable.
    pub fn build(self) -> Result<MqttBridge, Error> {
        if self.config.url.is_empty() {
            return Err(Error::InvalidConfiguration(
                "MQTT broker URL is required".to_string(),
            ));
        }
        parse_broker_url(&self.config.url)?;
        let router = TopicRouter::new(&self.config.topics);
        Ok(MqttBridge {
            inner: Arc::new(BridgeInner {
                config: self.config,
                router,
                callbacks: self.callbacks,
                state: Mutex::new(ConnectionState::Disconnected),
                session: tokio::sync::Mutex::new(None),
                reconnect_gate: tokio::sync::Mutex::new(()),
            }),
        })
    }
}
