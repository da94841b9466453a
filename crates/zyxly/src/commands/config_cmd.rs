//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntryView {
    name: String,
    default: bool,
    entry_id: String,
    host: String,
    username: String,
    /// Where the password comes from when no env override is set.
    password: &'static str,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Password")]
    password: &'static str,
}

impl From<&EntryView> for EntryRow {
    fn from(v: &EntryView) -> Self {
        Self {
            name: if v.default {
                format!("{} *", v.name)
            } else {
                v.name.clone()
            },
            host: v.host.clone(),
            username: v.username.clone(),
            password: v.password,
        }
    }
}

fn views(cfg: &Config) -> Vec<EntryView> {
    cfg.entries
        .iter()
        .map(|(name, e)| EntryView {
            name: name.clone(),
            default: cfg.default_entry.as_deref() == Some(name),
            entry_id: e.entry_id.clone(),
            host: e.host.clone(),
            username: e.username.clone(),
            password: if e.password.is_some() {
                "plaintext"
            } else {
                "keyring/env"
            },
        })
        .collect()
}

fn not_found(cfg: &Config, name: String) -> CliError {
    let available: Vec<_> = cfg.entries.keys().cloned().collect();
    CliError::EntryNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            if cfg.entries.is_empty() && !global.quiet {
                eprintln!("No entries configured. Run: zyxly setup");
                return Ok(());
            }
            let out = output::render_list(
                &global.output,
                &views(&cfg),
                |v| EntryRow::from(v),
                |v| v.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Remove { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.entries.contains_key(&name) {
                return Err(not_found(&cfg, name));
            }
            cfg.remove_entry(&name)?;
            config::save_config(&cfg)?;
            if let Err(e) = config::forget_password(&name) {
                tracing::warn!(entry = %name, error = %e, "could not remove keyring password");
            }
            if !global.quiet {
                eprintln!("✓ Removed entry '{name}'");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.entries.contains_key(&name) {
                return Err(not_found(&cfg, name));
            }
            cfg.default_entry = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default entry set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { name } => {
            let cfg = config::load_config()?;
            let name = match name.or_else(|| global.entry.clone()) {
                Some(n) if cfg.entries.contains_key(&n) => n,
                Some(n) => return Err(not_found(&cfg, n)),
                None => cfg.select_entry(None)?.0.to_owned(),
            };

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_password(&name, &secrecy::SecretString::from(secret))?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for entry '{name}'");
            }
            Ok(())
        }
    }
}
