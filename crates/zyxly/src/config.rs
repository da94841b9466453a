//! CLI configuration: thin wrapper around `zyxly_config`.
//!
//! Adds the resolution step that respects `GlobalOpts` overrides
//! (`--entry`, `--timeout`) and produces everything needed to open a
//! router connection.

use std::time::Duration;

use zyxly_api::{RouterClient, TransportConfig};
use zyxly_core::ConfigEntry;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use zyxly_config::{
    Config, StoredEntry, config_path, forget_password, load_config, save_config,
    store_password,
};

/// A stored entry resolved against the command line.
pub struct ResolvedEntry {
    /// Name the entry is stored under.
    pub name: String,
    pub entry: ConfigEntry,
    pub transport: TransportConfig,
}

impl ResolvedEntry {
    /// Build the HTTP client for this entry.
    pub fn client(&self) -> Result<RouterClient, CliError> {
        let data = &self.entry.data;
        Ok(RouterClient::new(
            &data.host,
            data.username.clone(),
            data.password.clone(),
            &self.transport,
        )?)
    }
}

/// Pick the entry named by `--entry` (or the default) and resolve its
/// password and transport settings.
pub fn resolve_entry(global: &GlobalOpts) -> Result<ResolvedEntry, CliError> {
    let cfg = load_config()?;
    let (name, stored) = cfg.select_entry(global.entry.as_deref())?;

    let entry = zyxly_config::stored_to_entry(stored, name)?;
    let mut transport = zyxly_config::transport_for(stored, &cfg.defaults);
    if let Some(secs) = global.timeout {
        transport.timeout = Duration::from_secs(secs);
    }

    Ok(ResolvedEntry {
        name: name.to_owned(),
        entry,
        transport,
    })
}
