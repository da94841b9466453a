// ── Config entries ──
//
// A config entry is one configured router: its connection data plus a
// stable identifier. Entity unique ids are derived from `entry_id`, so it
// must never change once the entry is persisted.

use secrecy::SecretString;
use uuid::Uuid;

/// Integration domain, used in device identifiers.
pub const DOMAIN: &str = "zyxel_nr7101";

/// Connection data for a single router.
#[derive(Debug, Clone)]
pub struct EntryData {
    /// Router base URL including scheme (`https://192.168.1.1`).
    pub host: String,
    pub username: String,
    pub password: SecretString,
}

/// A persisted, configured router.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub entry_id: String,
    /// Human label, e.g. `Zyxel device: (https://192.168.1.1)`.
    pub title: String,
    pub data: EntryData,
}

impl ConfigEntry {
    /// Create an entry with a freshly generated id.
    pub fn new(title: impl Into<String>, data: EntryData) -> Self {
        Self::with_id(Uuid::new_v4().simple().to_string(), title, data)
    }

    /// Rebuild an entry whose id was persisted earlier.
    pub fn with_id(entry_id: impl Into<String>, title: impl Into<String>, data: EntryData) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
            data,
        }
    }

    pub fn host(&self) -> &str {
        &self.data.host
    }
}

/// Title stored for an entry created against `host`.
pub fn entry_title(host: &str) -> String {
    format!("Zyxel device: ({host})")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> EntryData {
        EntryData {
            host: "https://192.168.1.1".into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
        }
    }

    #[test]
    fn new_entries_get_distinct_ids() {
        let a = ConfigEntry::new("a", data());
        let b = ConfigEntry::new("b", data());
        assert_ne!(a.entry_id, b.entry_id);
        assert_eq!(a.entry_id.len(), 32);
    }

    #[test]
    fn title_includes_host() {
        assert_eq!(
            entry_title("https://192.168.1.1"),
            "Zyxel device: (https://192.168.1.1)"
        );
    }
}
