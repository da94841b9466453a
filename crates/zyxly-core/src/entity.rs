// ── Entity projection ──
//
// Sensors and the reboot button. A sensor holds only its key path and a
// handle to the coordinator's cache; every read walks the live snapshot, so
// entities never go stale relative to the cache and never need updating
// after a refresh.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use zyxly_api::RouterAdapter;

use crate::classify::{EntityDescriptor, classify};
use crate::coordinator::SnapshotCache;
use crate::entry::{ConfigEntry, DOMAIN};
use crate::error::CoreError;
use crate::flatten::{KeyPath, flatten, lookup};

// ── DeviceInfo ───────────────────────────────────────────────────

/// The physical router all of an entry's entities belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, entry_id)`
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceInfo {
    pub fn for_entry(entry: &ConfigEntry) -> Self {
        Self {
            identifiers: (DOMAIN.to_owned(), entry.entry_id.clone()),
            name: format!("Zyxel ({})", entry.host()),
            manufacturer: "Zyxel",
            model: "Router",
        }
    }
}

// ── SensorEntity ─────────────────────────────────────────────────

/// Result of reading a sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum EntityState {
    Available(Value),
    Unavailable,
}

impl EntityState {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unavailable => None,
        }
    }
}

/// One flattened telemetry field exposed as a sensor.
#[derive(Clone)]
pub struct SensorEntity {
    unique_id: String,
    name: String,
    key_path: KeyPath,
    descriptor: EntityDescriptor,
    device: Arc<DeviceInfo>,
    cache: Arc<SnapshotCache>,
}

impl SensorEntity {
    pub fn new(
        entry_id: &str,
        key_path: KeyPath,
        descriptor: EntityDescriptor,
        device: Arc<DeviceInfo>,
        cache: Arc<SnapshotCache>,
    ) -> Self {
        Self {
            unique_id: format!("{entry_id}_{key_path}"),
            name: format!("Zyxel {}", descriptor.name()),
            key_path,
            descriptor,
            device,
            cache,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn unit(&self) -> Option<&'static str> {
        self.descriptor.unit()
    }

    pub fn icon(&self) -> &'static str {
        self.descriptor.icon()
    }

    /// Current value from the live snapshot. `None` when the path is
    /// missing, the value is null, or nothing has been fetched yet.
    pub fn native_value(&self) -> Option<Value> {
        let data = self.cache.data()?;
        lookup(&data, &self.key_path)
            .filter(|v| !v.is_null())
            .cloned()
    }

    pub fn available(&self) -> bool {
        self.cache.last_update_success() && self.native_value().is_some()
    }

    pub fn state(&self) -> EntityState {
        if !self.cache.last_update_success() {
            return EntityState::Unavailable;
        }
        self.native_value()
            .map_or(EntityState::Unavailable, EntityState::Available)
    }
}

impl std::fmt::Debug for SensorEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorEntity")
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .field("key_path", &self.key_path.to_string())
            .finish_non_exhaustive()
    }
}

/// Build the sensor set for `entry` from the cache's current snapshot.
///
/// Runs once, after the first successful refresh. Fields are visited in
/// snapshot order; a path already seen is not added twice. An empty cache
/// produces no sensors.
pub fn build_sensors(entry: &ConfigEntry, cache: &Arc<SnapshotCache>) -> Vec<SensorEntity> {
    let Some(snapshot) = cache.data() else {
        debug!(entry = %entry.entry_id, "no snapshot yet, no sensors built");
        return Vec::new();
    };

    let device = Arc::new(DeviceInfo::for_entry(entry));
    let mut seen = HashSet::new();
    let mut sensors = Vec::new();

    for field in flatten(&snapshot) {
        let Some(descriptor) = classify(&field.path, &field.value) else {
            continue;
        };
        let sensor = SensorEntity::new(
            &entry.entry_id,
            field.path,
            descriptor,
            Arc::clone(&device),
            Arc::clone(cache),
        );
        if seen.insert(sensor.unique_id.clone()) {
            sensors.push(sensor);
        }
    }

    info!(entry = %entry.entry_id, count = sensors.len(), "sensors built");
    sensors
}

// ── RebootButton ─────────────────────────────────────────────────

/// One-shot command that asks the router to reboot.
pub struct RebootButton<R: RouterAdapter> {
    unique_id: String,
    device: Arc<DeviceInfo>,
    router: Arc<R>,
}

impl<R: RouterAdapter> RebootButton<R> {
    pub const NAME: &'static str = "Zyxel Reboot";
    pub const ICON: &'static str = "mdi:restart";

    pub fn new(entry: &ConfigEntry, router: Arc<R>) -> Self {
        Self {
            unique_id: format!("{}_reboot", entry.entry_id),
            device: Arc::new(DeviceInfo::for_entry(entry)),
            router,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn icon(&self) -> &'static str {
        Self::ICON
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Send the reboot command.
    ///
    /// Runs on its own task so a slow or hung router cannot stall the
    /// caller's other work. Failures are logged and returned as
    /// [`CoreError::ActionFailed`]; polling is not affected.
    pub async fn press(&self) -> Result<(), CoreError> {
        let router = Arc::clone(&self.router);
        let outcome = tokio::spawn(async move { router.reboot().await }).await;

        let message = match outcome {
            Ok(Ok(())) => {
                info!(button = %self.unique_id, "reboot command sent");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(join) => join.to_string(),
        };

        error!(button = %self.unique_id, error = %message, "Failed to send reboot command");
        Err(CoreError::ActionFailed {
            action: "reboot",
            message,
        })
    }
}
