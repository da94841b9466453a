//! Sensor listing.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use zyxly_core::classify::render;
use zyxly_core::{DEFAULT_SCAN_INTERVAL, FlattenedField, SensorEntity, flatten, unflatten};

use crate::cli::{GlobalOpts, OutputFormat, SensorsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Views ───────────────────────────────────────────────────────────

/// Serializable snapshot of one sensor.
#[derive(Debug, Serialize)]
pub struct SensorView {
    pub unique_id: String,
    pub name: String,
    pub key: String,
    pub value: Option<Value>,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub device_class: Option<String>,
    pub state_class: Option<String>,
    pub available: bool,
}

impl From<&SensorEntity> for SensorView {
    fn from(s: &SensorEntity) -> Self {
        let d = s.descriptor();
        Self {
            unique_id: s.unique_id().to_owned(),
            name: s.name().to_owned(),
            key: s.key_path().to_string(),
            value: s.native_value(),
            unit: s.unit(),
            icon: s.icon(),
            device_class: d.device_class().map(|c| c.to_string()),
            state_class: d.state_class().map(|c| c.to_string()),
            available: s.available(),
        }
    }
}

impl SensorView {
    /// Value with unit, or `unavailable`.
    pub fn display_value(&self) -> String {
        match (&self.value, self.available) {
            (Some(v), true) => match self.unit.filter(|u| !u.is_empty()) {
                Some(unit) => format!("{} {unit}", render(v)),
                None => render(v),
            },
            _ => "unavailable".into(),
        }
    }

    fn matches(&self, filter: Option<&str>) -> bool {
        filter.is_none_or(|f| {
            let f = f.to_lowercase();
            self.name.to_lowercase().contains(&f) || self.key.to_lowercase().contains(&f)
        })
    }
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&SensorView> for SensorRow {
    fn from(v: &SensorView) -> Self {
        Self {
            name: v.name.clone(),
            value: v.display_value(),
            key: v.key.clone(),
        }
    }
}

#[derive(Tabled)]
struct RawRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&FlattenedField> for RawRow {
    fn from(f: &FlattenedField) -> Self {
        Self {
            key: f.path.to_string(),
            value: render(&f.value),
        }
    }
}

/// Sensors to show: available ones, or all with `--all`, narrowed by `--filter`.
pub fn select_views(sensors: &[SensorEntity], all: bool, filter: Option<&str>) -> Vec<SensorView> {
    sensors
        .iter()
        .map(SensorView::from)
        .filter(|v| all || v.available)
        .filter(|v| v.matches(filter))
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SensorsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::open_session(global, DEFAULT_SCAN_INTERVAL).await?;
    let loaded = session.loaded()?;

    let out = if args.raw {
        let fields: Vec<FlattenedField> = loaded
            .coordinator
            .cache()
            .data()
            .map(|snap| flatten(&snap))
            .unwrap_or_default();
        match global.output {
            // Structured formats get the nested shape back.
            OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
                output::render_single(
                    &global.output,
                    &unflatten(&fields),
                    |_| String::new(),
                    |_| String::new(),
                )
            }
            _ => output::render_list(&global.output, &fields, |f| RawRow::from(f), |f| {
                format!("{}={}", f.path, render(&f.value))
            }),
        }
    } else {
        let views = select_views(&loaded.sensors, args.all, args.filter.as_deref());
        output::render_list(&global.output, &views, |v| SensorRow::from(v), |v| {
            format!("{}\t{}", v.key, v.display_value())
        })
    };

    session.close().await;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(value: Option<Value>, unit: Option<&'static str>, available: bool) -> SensorView {
        SensorView {
            unique_id: "e_cellular.INTF_RSSI".into(),
            name: "Zyxel Cellular RSSI".into(),
            key: "cellular.INTF_RSSI".into(),
            value,
            unit,
            icon: "mdi:signal",
            device_class: Some("signal_strength".into()),
            state_class: Some("measurement".into()),
            available,
        }
    }

    #[test]
    fn display_value_appends_unit() {
        assert_eq!(view(Some(json!(-71)), Some("dBm"), true).display_value(), "-71 dBm");
        assert_eq!(view(Some(json!(7)), Some(""), true).display_value(), "7");
        assert_eq!(view(Some(json!("LTE")), None, true).display_value(), "LTE");
        assert_eq!(view(None, Some("dBm"), false).display_value(), "unavailable");
    }

    #[test]
    fn filter_matches_name_or_key_case_insensitively() {
        let v = view(Some(json!(-71)), Some("dBm"), true);
        assert!(v.matches(None));
        assert!(v.matches(Some("rssi")));
        assert!(v.matches(Some("CELLULAR.")));
        assert!(!v.matches(Some("temperature")));
    }
}
