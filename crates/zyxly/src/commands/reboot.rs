//! Reboot command.

use zyxly_core::DEFAULT_SCAN_INTERVAL;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

use super::util;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let host = config::resolve_entry(global)?.entry.host().to_owned();
    if !util::confirm(
        &format!("Reboot the router at {host}? It will be offline for a few minutes."),
        "reboot",
        global.yes,
    )? {
        return Ok(());
    }

    let session = util::open_session(global, DEFAULT_SCAN_INTERVAL).await?;
    let pressed = match session.loaded() {
        Ok(loaded) => loaded.button.press().await,
        Err(e) => {
            session.close().await;
            return Err(e);
        }
    };
    session.close().await;
    pressed?;

    if !global.quiet {
        eprintln!("✓ Reboot command sent to {host}");
    }
    Ok(())
}
