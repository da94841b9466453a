//! Continuous polling with change reporting.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use zyxly_core::{EntityState, SensorEntity};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::sensors::SensorView;
use super::util;

/// One reported value change.
#[derive(Debug, Serialize)]
struct Change<'a> {
    at: String,
    unique_id: &'a str,
    name: &'a str,
    previous: Option<&'a Value>,
    value: Option<&'a Value>,
}

/// States keyed by unique id; only sensors whose state differs from
/// `previous` are returned.
fn diff<'a>(
    sensors: &'a [SensorEntity],
    previous: &HashMap<String, EntityState>,
) -> Vec<(&'a SensorEntity, Option<EntityState>, EntityState)> {
    sensors
        .iter()
        .filter_map(|s| {
            let now = s.state();
            let before = previous.get(s.unique_id()).cloned();
            (before.as_ref() != Some(&now)).then_some((s, before, now))
        })
        .collect()
}

fn matches(s: &SensorEntity, filter: Option<&str>) -> bool {
    filter.is_none_or(|f| {
        let f = f.to_lowercase();
        s.name().to_lowercase().contains(&f) || s.key_path().to_string().to_lowercase().contains(&f)
    })
}

fn report(
    global: &GlobalOpts,
    color: bool,
    sensor: &SensorEntity,
    before: Option<&EntityState>,
    now: &EntityState,
) {
    let at = Local::now().format("%H:%M:%S").to_string();
    let line = match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            let change = Change {
                at,
                unique_id: sensor.unique_id(),
                name: sensor.name(),
                previous: before.and_then(EntityState::value),
                value: now.value(),
            };
            serde_json::to_string(&change).unwrap_or_default()
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let view = SensorView::from(sensor);
            let value = output::paint_value(&view.display_value(), view.available, color);
            format!("{at}  {}  {value}", output::paint_name(sensor.name(), color))
        }
    };
    output::print_output(&line, global.quiet);
}

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::open_session(global, Duration::from_secs(args.interval.max(1))).await?;
    let (sensors, coordinator) = {
        let loaded = session.loaded()?;
        (loaded.sensors.clone(), loaded.coordinator.clone())
    };
    let sensors: Vec<SensorEntity> = sensors
        .into_iter()
        .filter(|s| matches(s, args.filter.as_deref()))
        .collect();

    let color = output::should_color(&global.color);
    let mut rx = coordinator.subscribe();
    rx.borrow_and_update();

    let mut last: HashMap<String, EntityState> = HashMap::new();
    for (sensor, before, now) in diff(&sensors, &last) {
        report(global, color, sensor, before.as_ref(), &now);
        last.insert(sensor.unique_id().to_owned(), now);
    }

    if !global.quiet {
        eprintln!(
            "Watching {} sensors every {}s (Ctrl-C to stop)",
            sensors.len(),
            args.interval.max(1)
        );
    }

    let mut was_failing = false;
    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let cache = coordinator.cache();
                if cache.last_update_success() {
                    was_failing = false;
                } else if !was_failing {
                    was_failing = true;
                    let reason = cache.last_error().unwrap_or_default();
                    eprintln!("refresh failed: {reason}");
                }

                let changes = diff(&sensors, &last);
                debug!(changes = changes.len(), "refresh observed");
                for (sensor, before, now) in changes {
                    report(global, color, sensor, before.as_ref(), &now);
                    last.insert(sensor.unique_id().to_owned(), now);
                }
            }
        }
    }

    session.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secrecy::SecretString;
    use serde_json::json;
    use zyxly_core::{ConfigEntry, EntryData, SnapshotCache, build_sensors};

    fn sensors(cache: &Arc<SnapshotCache>) -> Vec<SensorEntity> {
        let entry = ConfigEntry::with_id(
            "e",
            "t",
            EntryData {
                host: "https://h".into(),
                username: "admin".into(),
                password: SecretString::from("pw".to_string()),
            },
        );
        build_sensors(&entry, cache)
    }

    fn object(v: Value) -> zyxly_core::Snapshot {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn diff_reports_only_changed_states() {
        let cache = Arc::new(SnapshotCache::new());
        cache.commit(object(json!({ "a": 1, "b": 2 })));
        let sensors = sensors(&cache);

        let mut last = HashMap::new();
        let first = diff(&sensors, &last);
        assert_eq!(first.len(), 2);
        for (s, _, now) in first {
            last.insert(s.unique_id().to_owned(), now);
        }

        cache.commit(object(json!({ "a": 1, "b": 3 })));
        let second = diff(&sensors, &last);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0.unique_id(), "e_b");
        assert_eq!(second[0].2, EntityState::Available(json!(3)));
    }

    #[test]
    fn filter_narrows_by_key() {
        let cache = Arc::new(SnapshotCache::new());
        cache.commit(object(json!({ "cellular": { "INTF_RSSI": -70 }, "x": 1 })));
        let s = sensors(&cache);
        let kept: Vec<_> = s.iter().filter(|s| matches(s, Some("cellular"))).collect();
        assert_eq!(kept.len(), 1);
    }
}
