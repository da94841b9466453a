// ── Snapshot flattening ──
//
// Turns a nested telemetry snapshot into an ordered list of addressable
// scalar fields. Paths are kept as segment lists so lookups never have to
// re-split a dotted string; the dotted form is only for display and ids.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use zyxly_api::Snapshot;

/// Separator used when rendering a path as a single string.
pub const SEPARATOR: char = '.';

/// Location of a scalar inside a snapshot, outermost key first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Split a dotted path. Keys that themselves contain the separator
    /// cannot be addressed this way.
    pub fn parse(dotted: &str) -> Self {
        Self(dotted.split(SEPARATOR).map(str::to_owned).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Final segment, the bare field name.
    pub fn last(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// The last `n` segments (fewer if the path is shorter).
    pub fn tail(&self, n: usize) -> &[String] {
        &self.0[self.0.len().saturating_sub(n)..]
    }

    fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_owned());
        Self(segments)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One scalar leaf of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedField {
    pub path: KeyPath,
    pub value: Value,
}

/// Flatten `snapshot` depth-first in key order.
///
/// Every scalar leaf (string, number, bool, null) becomes exactly one
/// field. Nested objects are descended into and never emitted themselves;
/// arrays are skipped.
pub fn flatten(snapshot: &Snapshot) -> Vec<FlattenedField> {
    let mut fields = Vec::new();
    walk(snapshot, &KeyPath::new(Vec::new()), &mut fields);
    fields
}

fn walk(map: &Snapshot, prefix: &KeyPath, out: &mut Vec<FlattenedField>) {
    for (key, value) in map {
        let path = prefix.child(key);
        match value {
            Value::Object(nested) => walk(nested, &path, out),
            Value::Array(_) => {}
            scalar => out.push(FlattenedField {
                path,
                value: scalar.clone(),
            }),
        }
    }
}

/// Rebuild a nested snapshot from flattened fields.
///
/// Later fields win if two paths collide; a scalar in the way of a deeper
/// path is replaced by an object.
pub fn unflatten(fields: &[FlattenedField]) -> Snapshot {
    let mut root = Snapshot::new();
    for field in fields {
        let Some((leaf, parents)) = field.path.segments().split_last() else {
            continue;
        };
        let mut node = &mut root;
        for segment in parents {
            let entry = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Snapshot::new()));
            if !entry.is_object() {
                *entry = Value::Object(Snapshot::new());
            }
            let Value::Object(next) = entry else {
                unreachable!("entry was just made an object")
            };
            node = next;
        }
        node.insert(leaf.clone(), field.value.clone());
    }
    root
}

/// Walk `path` through `snapshot`. `None` if any segment is missing or a
/// non-object is hit before the end of the path.
pub fn lookup<'a>(snapshot: &'a Snapshot, path: &KeyPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut value = snapshot.get(first)?;
    for segment in rest {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snap(v: Value) -> Snapshot {
        match v {
            Value::Object(m) => m,
            _ => panic!("test snapshot must be an object"),
        }
    }

    fn paths(fields: &[FlattenedField]) -> Vec<String> {
        fields.iter().map(|f| f.path.to_string()).collect()
    }

    #[test]
    fn flattens_nested_scalars_in_key_order() {
        let s = snap(json!({ "rssi": -80, "device": { "model": "X" } }));
        let fields = flatten(&s);

        assert_eq!(paths(&fields), ["rssi", "device.model"]);
        assert_eq!(fields[0].value, json!(-80));
        assert_eq!(fields[1].value, json!("X"));
    }

    #[test]
    fn emits_nulls_and_skips_arrays() {
        let s = snap(json!({
            "a": null,
            "b": [1, 2, 3],
            "c": { "d": true, "e": [] }
        }));
        assert_eq!(paths(&flatten(&s)), ["a", "c.d"]);
    }

    #[test]
    fn empty_objects_produce_no_fields() {
        let s = snap(json!({ "a": {}, "b": { "c": {} } }));
        assert!(flatten(&s).is_empty());
    }

    #[test]
    fn same_shape_yields_same_paths() {
        let first = snap(json!({
            "cellular": { "INTF_RSSI": -70, "INTF_SINR": 12 },
            "traffic": { "ipIfaceSt": { "BytesSent": 1 } }
        }));
        let second = snap(json!({
            "cellular": { "INTF_RSSI": -75, "INTF_SINR": 9 },
            "traffic": { "ipIfaceSt": { "BytesSent": 99 } }
        }));
        assert_eq!(paths(&flatten(&first)), paths(&flatten(&second)));
    }

    #[test]
    fn round_trip_through_dotted_paths_restores_leaves() {
        let original = snap(json!({
            "cellular": {
                "INTF_RSSI": -71,
                "INTF_Cell_ID": "0x1A2B",
                "nsa": { "NSA_RSRP": -101, "NSA_Enable": false }
            },
            "traffic": { "BytesSent": 1_234_567_u64, "Note": null },
            "uptime": 3600.5
        }));

        let dotted: Vec<(String, Value)> = flatten(&original)
            .into_iter()
            .map(|f| (f.path.to_string(), f.value))
            .collect();
        let reparsed: Vec<FlattenedField> = dotted
            .into_iter()
            .map(|(p, value)| FlattenedField {
                path: KeyPath::parse(&p),
                value,
            })
            .collect();

        assert_eq!(unflatten(&reparsed), original);
    }

    #[test]
    fn lookup_follows_path_and_reports_missing() {
        let s = snap(json!({ "device": { "model": "X", "fw": null } }));

        assert_eq!(
            lookup(&s, &KeyPath::parse("device.model")),
            Some(&json!("X"))
        );
        assert_eq!(lookup(&s, &KeyPath::parse("device.fw")), Some(&Value::Null));
        assert_eq!(lookup(&s, &KeyPath::parse("device.serial")), None);
        assert_eq!(lookup(&s, &KeyPath::parse("device.model.deeper")), None);
        assert_eq!(lookup(&s, &KeyPath::new(Vec::new())), None);
    }

    #[test]
    fn key_path_tail_and_display() {
        let p = KeyPath::parse("traffic.ipIfaceSt.BytesSent");
        assert_eq!(p.last(), "BytesSent");
        assert_eq!(p.tail(2), ["ipIfaceSt", "BytesSent"]);
        assert_eq!(p.tail(5).len(), 3);
        assert_eq!(p.to_string(), "traffic.ipIfaceSt.BytesSent");
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    /// Scalars the router can send, null included.
    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            (-1.0e6_f64..1.0e6).prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    /// Nested objects with dot-free keys, up to four levels deep.
    fn snapshot() -> impl Strategy<Value = Snapshot> {
        let tree = scalar().prop_recursive(4, 64, 6, |inner| {
            prop::collection::vec(("[a-zA-Z_][a-zA-Z0-9_]{0,7}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect()))
        });
        prop::collection::vec(("[a-zA-Z_][a-zA-Z0-9_]{0,7}", tree), 0..8)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Same keys in the same order, every leaf replaced by a counter.
    fn renumber(map: &Snapshot, next: &mut i64) -> Snapshot {
        map.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::Object(inner) => Value::Object(renumber(inner, next)),
                    _ => {
                        *next += 1;
                        Value::from(*next)
                    }
                };
                (k.clone(), v)
            })
            .collect()
    }

    fn paths(fields: &[FlattenedField]) -> Vec<String> {
        fields.iter().map(|f| f.path.to_string()).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn renesting_keeps_every_leaf(s in snapshot()) {
            let fields = flatten(&s);
            let nested = unflatten(&fields);

            for field in &fields {
                prop_assert_eq!(lookup(&nested, &field.path), Some(&field.value));
                prop_assert_eq!(lookup(&s, &field.path), Some(&field.value));
            }
            prop_assert_eq!(flatten(&nested), fields);
        }

        #[test]
        fn equal_shapes_flatten_to_equal_paths(s in snapshot()) {
            let relabelled = renumber(&s, &mut 0);
            prop_assert_eq!(paths(&flatten(&s)), paths(&flatten(&relabelled)));
            prop_assert_eq!(paths(&flatten(&s)), paths(&flatten(&s.clone())));
        }

        #[test]
        fn dotted_paths_parse_back(s in snapshot()) {
            for field in flatten(&s) {
                prop_assert_eq!(KeyPath::parse(&field.path.to_string()), field.path);
            }
        }
    }
}
