//! Stored router entries for the zyxly CLI.
//!
//! TOML config via figment (file + `ZYXLY_` environment), credential
//! resolution (env, keyring, plaintext), and translation of a stored entry
//! into a `zyxly_core::ConfigEntry` plus the transport settings for its
//! `RouterClient`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zyxly_api::{TlsMode, TransportConfig};
use zyxly_core::{ConfigEntry, EntryData};

/// Keyring service name; accounts are `{entry}/password`.
const KEYRING_SERVICE: &str = "zyxly";

/// Overrides every other password source.
pub const PASSWORD_ENV: &str = "ZYXLY_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no entry named '{name}'")]
    UnknownEntry { name: String },

    #[error("no router configured; run `zyxly setup` first")]
    NoEntries,

    #[error("several entries configured and none selected; pass --entry or set default_entry")]
    AmbiguousEntry,

    #[error("no password configured for entry '{entry}'")]
    NoCredentials { entry: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Entry used when `--entry` is not given.
    pub default_entry: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Configured routers, in the order they were added.
    #[serde(default)]
    pub entries: IndexMap<String, StoredEntry>,
}

/// Settings shared by every entry unless the entry overrides them.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

/// One configured router as persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredEntry {
    /// Stable id; sensor unique ids derive from it.
    pub entry_id: String,

    pub title: String,

    /// Router base URL including scheme.
    pub host: String,

    pub username: String,

    /// Plaintext password (prefer keyring or `ZYXLY_PASSWORD`).
    pub password: Option<String>,

    /// PEM CA bundle to trust instead of accepting any certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override request timeout for this router.
    pub timeout: Option<u64>,
}

impl StoredEntry {
    /// Persistable form of `entry`. The password is only written when
    /// `plaintext_password` is set.
    pub fn from_entry(entry: &ConfigEntry, plaintext_password: bool) -> Self {
        Self {
            entry_id: entry.entry_id.clone(),
            title: entry.title.clone(),
            host: entry.data.host.clone(),
            username: entry.data.username.clone(),
            password: plaintext_password.then(|| entry.data.password.expose_secret().to_owned()),
            ca_cert: None,
            timeout: None,
        }
    }
}

impl Config {
    /// Pick the entry to operate on: the named one, else `default_entry`,
    /// else the only configured entry.
    pub fn select_entry<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a StoredEntry), ConfigError> {
        let wanted = name.or(self.default_entry.as_deref());

        if let Some(wanted) = wanted {
            return self
                .entries
                .get_key_value(wanted)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| ConfigError::UnknownEntry {
                    name: wanted.into(),
                });
        }

        match self.entries.len() {
            0 => Err(ConfigError::NoEntries),
            1 => Ok(self
                .entries
                .first()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or(ConfigError::NoEntries)?),
            _ => Err(ConfigError::AmbiguousEntry),
        }
    }

    /// Add or replace `name`. The first entry added becomes the default.
    pub fn insert_entry(&mut self, name: impl Into<String>, entry: StoredEntry) {
        let name = name.into();
        if self.default_entry.is_none() {
            self.default_entry = Some(name.clone());
        }
        self.entries.insert(name, entry);
    }

    /// Drop `name`, moving the default to the next remaining entry.
    pub fn remove_entry(&mut self, name: &str) -> Result<StoredEntry, ConfigError> {
        let removed = self
            .entries
            .shift_remove(name)
            .ok_or_else(|| ConfigError::UnknownEntry { name: name.into() })?;
        if self.default_entry.as_deref() == Some(name) {
            self.default_entry = self.entries.keys().next().cloned();
        }
        Ok(removed)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "zyxly", "zyxly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("zyxly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn file_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
}

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let figment = file_figment(&config_path()).merge(
        Env::prefixed("ZYXLY_")
            .ignore(&["password", "entry", "config"])
            .split("__"),
    );
    Ok(figment.extract()?)
}

/// Load a config file without consulting the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(file_figment(path).extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(entry_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{entry_name}/password"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the router password: env var, then keyring, then plaintext.
pub fn resolve_password(
    stored: &StoredEntry,
    entry_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(entry_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = stored.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        entry: entry_name.into(),
    })
}

/// Store `password` for `entry_name` in the system keyring.
pub fn store_password(entry_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(entry_name)?
        .set_password(password.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Remove the keyring password for `entry_name`. Missing entries are fine.
pub fn forget_password(entry_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(entry_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(ConfigError::Keyring(e.to_string())),
    }
}

// ── Translation to runtime types ────────────────────────────────────

/// Build the runtime entry for `stored`, resolving its password.
pub fn stored_to_entry(stored: &StoredEntry, entry_name: &str) -> Result<ConfigEntry, ConfigError> {
    stored_to_entry_with(stored, resolve_password(stored, entry_name)?)
}

/// Build the runtime entry with an already-known password.
pub fn stored_to_entry_with(
    stored: &StoredEntry,
    password: SecretString,
) -> Result<ConfigEntry, ConfigError> {
    if !(stored.host.starts_with("http://") || stored.host.starts_with("https://")) {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("expected http:// or https:// URL, got '{}'", stored.host),
        });
    }
    Ok(ConfigEntry::with_id(
        stored.entry_id.clone(),
        stored.title.clone(),
        EntryData {
            host: stored.host.clone(),
            username: stored.username.clone(),
            password,
        },
    ))
}

/// Transport settings for talking to `stored`.
///
/// Routers ship self-signed certificates, so invalid certificates are
/// accepted unless a CA bundle is configured.
pub fn transport_for(stored: &StoredEntry, defaults: &Defaults) -> TransportConfig {
    let tls = stored
        .ca_cert
        .clone()
        .map_or(TlsMode::DangerAcceptInvalid, TlsMode::CustomCa);
    let timeout = Duration::from_secs(stored.timeout.unwrap_or(defaults.timeout));

    TransportConfig {
        tls,
        timeout,
        ..TransportConfig::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stored(host: &str) -> StoredEntry {
        StoredEntry {
            entry_id: "abc".into(),
            title: format!("Zyxel device: ({host})"),
            host: host.into(),
            username: "admin".into(),
            password: Some("pw".into()),
            ca_cert: None,
            timeout: None,
        }
    }

    #[test]
    fn save_then_load_round_trips_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.insert_entry("home", stored("https://192.168.1.1"));
        cfg.insert_entry("cabin", stored("http://10.0.0.1"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_entry.as_deref(), Some("home"));
        let names: Vec<&str> = loaded.entries.keys().map(String::as_str).collect();
        assert_eq!(names, ["home", "cabin"]);
        assert_eq!(loaded.entries["cabin"], stored("http://10.0.0.1"));
        assert_eq!(loaded.defaults.timeout, 10);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.entries.is_empty());
        assert_eq!(cfg.defaults.timeout, 10);
    }

    #[test]
    fn defaults_only_carry_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        save_config_to(&Config::default(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("timeout = 10"), "{text}");
        assert!(!text.contains("output"), "{text}");
        assert!(!text.contains("color"), "{text}");

        std::fs::write(&path, "[defaults]\ntimeout = 25\n").unwrap();
        assert_eq!(load_config_from(&path).unwrap().defaults.timeout, 25);
    }

    #[test]
    fn select_prefers_name_then_default_then_single() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.select_entry(None), Err(ConfigError::NoEntries)));

        cfg.entries.insert("only".into(), stored("https://a"));
        assert_eq!(cfg.select_entry(None).unwrap().0, "only");

        cfg.entries.insert("other".into(), stored("https://b"));
        assert!(matches!(cfg.select_entry(None), Err(ConfigError::AmbiguousEntry)));

        cfg.default_entry = Some("other".into());
        assert_eq!(cfg.select_entry(None).unwrap().0, "other");
        assert_eq!(cfg.select_entry(Some("only")).unwrap().0, "only");
        assert!(matches!(
            cfg.select_entry(Some("nope")),
            Err(ConfigError::UnknownEntry { .. })
        ));
    }

    #[test]
    fn removing_default_moves_it() {
        let mut cfg = Config::default();
        cfg.insert_entry("a", stored("https://a"));
        cfg.insert_entry("b", stored("https://b"));

        cfg.remove_entry("a").unwrap();
        assert_eq!(cfg.default_entry.as_deref(), Some("b"));
        cfg.remove_entry("b").unwrap();
        assert_eq!(cfg.default_entry, None);
        assert!(cfg.remove_entry("b").is_err());
    }

    #[test]
    fn stored_entry_keeps_id_and_host() {
        let password = SecretString::from("x".to_string());
        let entry = stored_to_entry_with(&stored("https://192.168.1.1"), password).unwrap();
        assert_eq!(entry.entry_id, "abc");
        assert_eq!(entry.host(), "https://192.168.1.1");
        assert_eq!(entry.data.password.expose_secret(), "x");
    }

    #[test]
    fn schemeless_host_is_rejected() {
        let err = stored_to_entry_with(&stored("192.168.1.1"), SecretString::from("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn plaintext_password_only_when_asked() {
        let entry = stored_to_entry_with(&stored("https://a"), SecretString::from("pw".to_string()))
            .unwrap();
        assert_eq!(StoredEntry::from_entry(&entry, false).password, None);
        assert_eq!(
            StoredEntry::from_entry(&entry, true).password.as_deref(),
            Some("pw")
        );
    }

    #[test]
    fn transport_accepts_self_signed_unless_ca_given() {
        let defaults = Defaults::default();
        let mut s = stored("https://a");
        let t = transport_for(&s, &defaults);
        assert!(matches!(t.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(t.timeout, Duration::from_secs(10));

        s.ca_cert = Some(PathBuf::from("/etc/ca.pem"));
        s.timeout = Some(3);
        let t = transport_for(&s, &defaults);
        assert!(matches!(t.tls, TlsMode::CustomCa(_)));
        assert_eq!(t.timeout, Duration::from_secs(3));
    }
}
