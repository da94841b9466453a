// ── Field classification ──
//
// Maps a flattened key path onto the metadata an entity needs. Lookup is
// by the final path segment only: a field called `INTF_RSSI` is the same
// sensor wherever it appears in the tree. The four serving-cell signal
// metrics also match by their bare name (`rssi`, `RSRP`) when the value is
// numeric and the field does not sit under an NSA subtree. Two different paths with the
// same final segment therefore get the same descriptor (and the same
// display name); their unique ids still differ because those use the full
// path.

use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::flatten::KeyPath;

/// Icon for fields that have no registry entry.
pub const GENERIC_ICON: &str = "mdi:router-wireless";

/// Generic fields whose rendered value is this long or longer are not
/// exposed as entities (free-form blobs, certificate text and the like).
pub const MAX_GENERIC_VALUE_LEN: usize = 100;

/// Measurement category, named the way home-automation platforms name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    SignalStrength,
    Temperature,
    DataSize,
}

/// How successive values relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Static metadata for a recognized field.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    /// `None` for identifiers; `Some("")` for unitless measurements.
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
}

/// What to build for one flattened field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDescriptor {
    Known(&'static FieldDescriptor),
    Generic { name: String, icon: &'static str },
}

impl EntityDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Known(field) => field.name,
            Self::Generic { name, .. } => name,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Known(field) => field.icon,
            Self::Generic { icon, .. } => icon,
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Known(field) => field.unit,
            Self::Generic { .. } => None,
        }
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        match self {
            Self::Known(field) => field.device_class,
            Self::Generic { .. } => None,
        }
    }

    pub fn state_class(&self) -> Option<StateClass> {
        match self {
            Self::Known(field) => field.state_class,
            Self::Generic { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

macro_rules! field {
    ($key:literal, $name:literal, $unit:expr, $icon:literal, $dc:expr, $sc:expr) => {
        FieldDescriptor {
            key: $key,
            name: $name,
            unit: $unit,
            icon: $icon,
            device_class: $dc,
            state_class: $sc,
        }
    };
}

use DeviceClass::{DataSize, SignalStrength, Temperature};
use StateClass::{Measurement, TotalIncreasing};

/// Registry of recognized fields, keyed by final path segment.
#[rustfmt::skip]
pub static KNOWN_FIELDS: &[FieldDescriptor] = &[
    // LTE / NR serving cell
    field!("INTF_RSSI", "Cellular RSSI", Some("dBm"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("INTF_PhyCell_ID", "Physical Cell ID", None, "mdi:antenna", None, None),
    field!("INTF_RSRP", "Cellular Reference Signal Received Power", Some("dBm"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("INTF_RSRQ", "Cellular Reference Signal Received Quality", Some("dB"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("INTF_SINR", "Cellular Signal-to-Noise Ratio", Some("dB"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("INTF_MCS", "Cellular Modulation and Coding Scheme", Some(""), "mdi:signal", None, Some(Measurement)),
    field!("INTF_CQI", "Cellular Channel Quality Indicator", Some(""), "mdi:signal", None, Some(Measurement)),
    field!("INTF_RI", "Cellular Rank Indicator", Some(""), "mdi:signal", None, Some(Measurement)),
    field!("INTF_PMI", "Cellular Precoding Matrix Indicator", Some(""), "mdi:signal", None, Some(Measurement)),
    // 5G NSA secondary cell
    field!("NSA_PhyCellID", "NSA Physical Cell ID", None, "mdi:antenna", None, None),
    field!("NSA_RSRP", "NSA Reference Signal Received Power", Some("dBm"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("NSA_RSRQ", "NSA Reference Signal Received Quality", Some("dB"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("NSA_RSSI", "NSA Reference Signal Strength Indicator", Some("dBm"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    field!("NSA_SINR", "NSA Signal-to-Noise Ratio", Some("dB"), "mdi:signal", Some(SignalStrength), Some(Measurement)),
    // Thermal
    field!("X_ZYXEL_TEMPERATURE_AMBIENT", "Ambient Temperature", Some("°C"), "mdi:thermometer", Some(Temperature), Some(Measurement)),
    field!("X_ZYXEL_TEMPERATURE_SDX", "SDX Temperature", Some("°C"), "mdi:thermometer", Some(Temperature), Some(Measurement)),
    field!("X_ZYXEL_TEMPERATURE_CPU0", "CPU Temperature", Some("°C"), "mdi:thermometer", Some(Temperature), Some(Measurement)),
    // Traffic counters
    field!("BytesSent", "Bytes Sent", Some("B"), "mdi:numeric-10-box", Some(DataSize), Some(TotalIncreasing)),
    field!("BytesReceived", "Bytes Received", Some("B"), "mdi:numeric-10-box", Some(DataSize), Some(TotalIncreasing)),
];

/// Bare signal metric names and the registry keys they stand for.
const SIGNAL_ALIASES: &[(&str, &str)] = &[
    ("rssi", "INTF_RSSI"),
    ("rsrp", "INTF_RSRP"),
    ("rsrq", "INTF_RSRQ"),
    ("sinr", "INTF_SINR"),
];

/// Registry lookup by exact field name.
pub fn known_field(key: &str) -> Option<&'static FieldDescriptor> {
    KNOWN_FIELDS.iter().find(|f| f.key == key)
}

fn signal_alias(path: &KeyPath, value: &Value) -> Option<&'static FieldDescriptor> {
    if !value.is_number() {
        return None;
    }
    let (last, parents) = path.segments().split_last()?;
    if parents.iter().any(|p| p.to_ascii_lowercase().starts_with("nsa")) {
        return None;
    }
    SIGNAL_ALIASES
        .iter()
        .find(|(bare, _)| bare.eq_ignore_ascii_case(last))
        .and_then(|(_, key)| known_field(key))
}

/// Describe the entity for the field at `path` holding `value`.
///
/// Pure. Returns `None` when the field should not become an entity: null
/// values, and generic fields whose value renders to
/// [`MAX_GENERIC_VALUE_LEN`] characters or more. Known fields are kept
/// regardless of length.
pub fn classify(path: &KeyPath, value: &Value) -> Option<EntityDescriptor> {
    if value.is_null() {
        return None;
    }
    if let Some(field) = known_field(path.last()).or_else(|| signal_alias(path, value)) {
        return Some(EntityDescriptor::Known(field));
    }
    if render(value).chars().count() >= MAX_GENERIC_VALUE_LEN {
        return None;
    }
    Some(EntityDescriptor::Generic {
        name: path.tail(2).join(" "),
        icon: GENERIC_ICON,
    })
}

/// Display form of a scalar. Strings render without quotes.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
