// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback storage and dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::decode::{
    DoorUpdate, EnergyUpdate, PvUpdate, SensorUpdate, SwitchUpdate, WeatherUpdate, WolUpdate,
};
use crate::types::ConnectionState;

/// Unique identifier for a subscription.
///
/// Returned when registering a callback; pass it to
/// [`CallbackRegistry::unsubscribe`] to remove the callback again. IDs
/// are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type ConnectionCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;
type DoorCallback = Arc<dyn Fn(&DoorUpdate) + Send + Sync>;
type WolCallback = Arc<dyn Fn(&WolUpdate) + Send + Sync>;
type SensorCallback = Arc<dyn Fn(&SensorUpdate) + Send + Sync>;
type WeatherCallback = Arc<dyn Fn(&WeatherUpdate) + Send + Sync>;
type SwitchCallback = Arc<dyn Fn(&SwitchUpdate) + Send + Sync>;
type PvCallback = Arc<dyn Fn(&PvUpdate) + Send + Sync>;
type EnergyCallback = Arc<dyn Fn(&EnergyUpdate) + Send + Sync>;

/// Registry for connection-state and device-update callbacks.
///
/// Thread-safe via `parking_lot::RwLock`; callbacks are wrapped in `Arc`
/// and cloned out of the lock before invocation, so a slow callback never
/// blocks registration.
#[derive(Default)]
pub struct CallbackRegistry {
    next_id: AtomicU64,
    connection: RwLock<HashMap<SubscriptionId, ConnectionCallback>>,
    door: RwLock<HashMap<SubscriptionId, DoorCallback>>,
    wol: RwLock<HashMap<SubscriptionId, WolCallback>>,
    sensor: RwLock<HashMap<SubscriptionId, SensorCallback>>,
    weather: RwLock<HashMap<SubscriptionId, WeatherCallback>>,
    switch: RwLock<HashMap<SubscriptionId, SwitchCallback>>,
    pv: RwLock<HashMap<SubscriptionId, PvCallback>>,
    energy: RwLock<HashMap<SubscriptionId, EnergyCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a callback for connection-state transitions.
    pub fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connection.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for door/lock portal updates.
    pub fn on_door_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DoorUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.door.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for wake-on-LAN host updates.
    pub fn on_wol_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&WolUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.wol.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for generic sensor updates.
    pub fn on_sensor_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SensorUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.sensor.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for weather-station updates.
    pub fn on_weather_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&WeatherUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.weather.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for switch updates.
    pub fn on_switch_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SwitchUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.switch.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for PV inverter updates.
    pub fn on_pv_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PvUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.pv.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for grid-meter updates.
    pub fn on_energy_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EnergyUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.energy.write().insert(id, Arc::new(callback));
        id
    }

    /// Removes a subscription from whichever channel holds it.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.connection.write().remove(&id).is_some()
            || self.door.write().remove(&id).is_some()
            || self.wol.write().remove(&id).is_some()
            || self.sensor.write().remove(&id).is_some()
            || self.weather.write().remove(&id).is_some()
            || self.switch.write().remove(&id).is_some()
            || self.pv.write().remove(&id).is_some()
            || self.energy.write().remove(&id).is_some()
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.connection.read().len()
            + self.door.read().len()
            + self.wol.read().len()
            + self.sensor.read().len()
            + self.weather.read().len()
            + self.switch.read().len()
            + self.pv.read().len()
            + self.energy.read().len()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub(crate) fn dispatch_connection(&self, state: ConnectionState) {
        for callback in Self::snapshot(&self.connection) {
            callback(state);
        }
    }

    pub(crate) fn dispatch_door(&self, update: &DoorUpdate) {
        for callback in Self::snapshot(&self.door) {
            callback(update);
        }
    }

    pub(crate) fn dispatch_wol(&self, update: &WolUpdate) {
        for callback in Self::snapshot(&self.wol) {
            callback(update);
        }
    }

    pub(crate) fn dispatch_sensor(&self, update: &SensorUpdate) {
        for callback in Self::snapshot(&self.sensor) {
            callback(update);
        }
    }

    pub(crate) fn dispatch_weather(&self, update: &WeatherUpdate) {
        for callback in Self::snapshot(&self.weather) {
            callback(update);
        }
    }

    pub(crate) fn dispatch_switch(&self, update: &SwitchUpdate) {
        for callback in Self::snapshot(&self.switch) {
            callback(update);
        }
    }

    pub(crate) fn dispatch_pv(&self, update: &PvUpdate) {
        for callback in Self::snapshot(&self.pv) {
            callback(update);
        }
    }

    pub(crate) fn dispatch_energy(&self, update: &EnergyUpdate) {
        for callback in Self::snapshot(&self.energy) {
            callback(update);
        }
    }

    /// Clones the callbacks out of the lock so dispatch runs unlocked.
    fn snapshot<T: Clone>(map: &RwLock<HashMap<SubscriptionId, T>>) -> Vec<T> {
        map.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.callback_count())
            .finish()
    }
}
