//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use zyxly_api::RouterClient;
use zyxly_core::{CoreError, Hub, LoadedEntry, REFRESH_TIMEOUT};

use crate::cli::GlobalOpts;
use crate::config::{self, ResolvedEntry};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Stderr spinner; hidden in quiet mode or when stderr is not a terminal.
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// A loaded router entry plus the hub that owns it.
pub struct Session {
    pub hub: Hub<RouterClient>,
    pub resolved: ResolvedEntry,
}

impl Session {
    pub fn loaded(&self) -> Result<&LoadedEntry<RouterClient>, CliError> {
        self.hub.get(&self.resolved.entry.entry_id).ok_or_else(|| {
            CoreError::EntryNotLoaded {
                entry_id: self.resolved.entry.entry_id.clone(),
            }
            .into()
        })
    }

    /// Stop polling and log out.
    pub async fn close(mut self) {
        self.hub.unload_all().await;
    }
}

/// Resolve the active entry, log in, run the first poll, and build
/// entities. Polling continues every `interval` until the session closes.
pub async fn open_session(global: &GlobalOpts, interval: Duration) -> Result<Session, CliError> {
    let resolved = config::resolve_entry(global)?;
    let client = resolved.client()?;
    let host = resolved.entry.host().to_owned();

    let mut hub = Hub::with_timing(interval, REFRESH_TIMEOUT);
    let pb = spinner(format!("Connecting to {host}..."), global.quiet);
    let outcome = hub.setup(resolved.entry.clone(), client).await.map(|_| ());
    pb.finish_and_clear();

    outcome.map_err(|e| match e {
        CoreError::NotReady { reason } => CliError::NotReady { host, reason },
        other => CliError::from(other).for_entry(&resolved.name),
    })?;

    Ok(Session { hub, resolved })
}
