//! Command dispatch: bridges CLI args to core operations and output formatting.

pub mod config_cmd;
pub mod reboot;
pub mod sensors;
pub mod setup;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a router-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Setup(args) => setup::handle(args, global).await,
        Command::Sensors(args) => sensors::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Reboot => reboot::handle(global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
