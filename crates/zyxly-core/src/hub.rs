// ── Entry lifecycle ──
//
// `Hub` owns the runtime state of every loaded config entry. Setup runs the
// first refresh, builds entities, and starts polling; unload stops the poll
// task and closes the router session. Nothing here is global: callers hold
// the hub and pass it where it is needed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use zyxly_api::RouterAdapter;

use crate::coordinator::{Coordinator, DEFAULT_SCAN_INTERVAL, REFRESH_TIMEOUT};
use crate::entity::{RebootButton, SensorEntity, build_sensors};
use crate::entry::{ConfigEntry, DOMAIN};
use crate::error::CoreError;

/// Everything kept alive for one loaded entry.
pub struct LoadedEntry<R: RouterAdapter> {
    pub entry: ConfigEntry,
    pub coordinator: Coordinator<R>,
    pub sensors: Vec<SensorEntity>,
    pub button: RebootButton<R>,
    cancel: CancellationToken,
    poll: JoinHandle<()>,
}

impl<R: RouterAdapter> LoadedEntry<R> {
    pub fn router(&self) -> &Arc<R> {
        self.coordinator.router()
    }
}

/// Owner of all loaded entries.
pub struct Hub<R: RouterAdapter> {
    entries: HashMap<String, LoadedEntry<R>>,
    interval: Duration,
    timeout: Duration,
}

impl<R: RouterAdapter> Default for Hub<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RouterAdapter> Hub<R> {
    pub fn new() -> Self {
        Self::with_timing(DEFAULT_SCAN_INTERVAL, REFRESH_TIMEOUT)
    }

    /// Override poll interval and refresh timeout for entries set up later.
    pub fn with_timing(interval: Duration, timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            interval,
            timeout,
        }
    }

    /// Load `entry` using `router`.
    ///
    /// Fails with [`CoreError::NotReady`] if the first refresh fails, in
    /// which case nothing is stored and no task is left running.
    pub async fn setup(
        &mut self,
        entry: ConfigEntry,
        router: R,
    ) -> Result<&LoadedEntry<R>, CoreError> {
        if self.entries.contains_key(&entry.entry_id) {
            return Err(CoreError::EntryAlreadyLoaded {
                entry_id: entry.entry_id,
            });
        }

        let router = Arc::new(router);
        let coordinator =
            Coordinator::with_timing(DOMAIN, Arc::clone(&router), self.interval, self.timeout);

        coordinator.first_refresh().await?;

        let sensors = build_sensors(&entry, coordinator.cache());
        let button = RebootButton::new(&entry, router);
        let cancel = CancellationToken::new();
        let poll = coordinator.spawn(cancel.clone());

        info!(
            entry = %entry.entry_id,
            host = %entry.host(),
            sensors = sensors.len(),
            "entry loaded"
        );

        let id = entry.entry_id.clone();
        let loaded = LoadedEntry {
            entry,
            coordinator,
            sensors,
            button,
            cancel,
            poll,
        };
        Ok(self.entries.entry(id).or_insert(loaded))
    }

    pub fn get(&self, entry_id: &str) -> Option<&LoadedEntry<R>> {
        self.entries.get(entry_id)
    }

    pub fn is_loaded(&self, entry_id: &str) -> bool {
        self.entries.contains_key(entry_id)
    }

    pub fn entry_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Stop polling for `entry_id`, log out, and drop its state.
    ///
    /// A failed logout is logged; the entry is unloaded regardless.
    pub async fn unload(&mut self, entry_id: &str) -> Result<(), CoreError> {
        let loaded = self
            .entries
            .remove(entry_id)
            .ok_or_else(|| CoreError::EntryNotLoaded {
                entry_id: entry_id.to_owned(),
            })?;

        loaded.cancel.cancel();
        if let Err(e) = loaded.poll.await {
            warn!(entry = %entry_id, error = %e, "poll task ended abnormally");
        }

        if let Err(e) = loaded.coordinator.router().logout().await {
            warn!(entry = %entry_id, error = %e, "logout failed during unload");
        }

        info!(entry = %entry_id, "entry unloaded");
        Ok(())
    }

    /// Unload every entry.
    pub async fn unload_all(&mut self) {
        let ids: Vec<String> = self.entries.keys().cloned().collect();
        for id in ids {
            // Only fails for ids that are not loaded, which cannot happen here.
            let _ = self.unload(&id).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use serde_json::json;

    use crate::coordinator::tests::{FakeRouter, snap};
    use crate::entry::EntryData;

    fn entry(id: &str) -> ConfigEntry {
        ConfigEntry::with_id(
            id,
            "t",
            EntryData {
                host: "https://192.168.1.1".into(),
                username: "admin".into(),
                password: SecretString::from("pw".to_string()),
            },
        )
    }

    #[tokio::test]
    async fn setup_builds_entities_and_unload_logs_out() {
        let mut hub = Hub::new();
        let router = FakeRouter::serving(snap(json!({
            "device": { "model": "X" },
            "cellular": { "INTF_RSSI": -70 }
        })));

        let loaded = hub.setup(entry("e1"), router).await.unwrap();
        assert_eq!(loaded.sensors.len(), 2);
        assert_eq!(loaded.button.unique_id(), "e1_reboot");
        let router = Arc::clone(loaded.router());

        assert!(hub.is_loaded("e1"));
        hub.unload("e1").await.unwrap();

        assert!(!hub.is_loaded("e1"));
        assert_eq!(router.logout_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_refresh_failure_stores_nothing() {
        let mut hub = Hub::new();

        let err = hub.setup(entry("e1"), FakeRouter::default()).await.err().unwrap();

        assert!(matches!(err, CoreError::NotReady { .. }));
        assert!(err.to_string().contains("No data received from router"), "{err}");
        assert!(!hub.is_loaded("e1"));
    }

    #[tokio::test]
    async fn duplicate_setup_is_rejected() {
        let mut hub = Hub::new();
        hub.setup(entry("e1"), FakeRouter::serving(snap(json!({ "device": 1 }))))
            .await
            .unwrap();

        let err = hub
            .setup(entry("e1"), FakeRouter::serving(snap(json!({ "device": 1 }))))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::EntryAlreadyLoaded { .. }));
        hub.unload_all().await;
    }

    #[tokio::test]
    async fn unload_of_unknown_entry_errors() {
        let mut hub: Hub<FakeRouter> = Hub::new();
        let err = hub.unload("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::EntryNotLoaded { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_entry_keeps_polling() {
        let mut hub = Hub::with_timing(Duration::from_secs(30), REFRESH_TIMEOUT);
        let router = FakeRouter::serving(snap(json!({ "device": 1 })));
        let loaded = hub.setup(entry("e1"), router).await.unwrap();
        let router = Arc::clone(loaded.router());
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(router.status_calls.load(Ordering::SeqCst), 3);

        hub.unload_all().await;
        assert_eq!(hub.entry_ids().count(), 0);
    }
}
