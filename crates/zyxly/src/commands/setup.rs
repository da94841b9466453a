//! Interactive setup: validate a router and store it as an entry.

use std::io::IsTerminal;

use dialoguer::{Input, Select};
use secrecy::SecretString;

use zyxly_api::{RouterClient, TlsMode, TransportConfig};
use zyxly_core::{
    ConfigEntry, ConfigFlow, DEFAULT_HOST, DEFAULT_USERNAME, EntryData, FlowErrorKind, FlowResult,
    UserInput, normalize_host,
};

use crate::cli::{GlobalOpts, PasswordStore, SetupArgs};
use crate::config::{self, StoredEntry};
use crate::error::CliError;

use super::util::{prompt_err, spinner};

fn ask(prompt: &str, default: &str) -> Result<String, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(default.to_owned())
        .interact_text()
        .map_err(prompt_err)
}

fn password() -> Result<String, CliError> {
    if let Ok(pw) = std::env::var(zyxly_config::PASSWORD_ENV) {
        return Ok(pw);
    }
    rpassword::prompt_password("Password: ").map_err(prompt_err)
}

fn choose_store(interactive: bool) -> Result<PasswordStore, CliError> {
    if !interactive {
        return Ok(PasswordStore::Keyring);
    }
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Do not store (use ZYXLY_PASSWORD)",
    ];
    let picked = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    Ok(match picked {
        0 => PasswordStore::Keyring,
        1 => PasswordStore::Plaintext,
        _ => PasswordStore::None,
    })
}

pub async fn handle(args: SetupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let interactive = std::io::stdin().is_terminal() && !global.yes;

    let host = match args.host {
        Some(h) => h,
        None if interactive => ask("Router address", DEFAULT_HOST)?,
        None => DEFAULT_HOST.to_owned(),
    };
    let username = match args.username {
        Some(u) => u,
        None if interactive => ask("Username", DEFAULT_USERNAME)?,
        None => DEFAULT_USERNAME.to_owned(),
    };
    let password = password()?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    let mut transport = TransportConfig::default();
    if let Some(ref ca) = args.ca_cert {
        transport.tls = TlsMode::CustomCa(ca.clone());
    }
    if let Some(secs) = global.timeout {
        transport.timeout = std::time::Duration::from_secs(secs);
    }

    let flow = ConfigFlow::new(move |data: &EntryData| {
        RouterClient::new(
            &data.host,
            data.username.clone(),
            data.password.clone(),
            &transport,
        )
    });

    let pb = spinner(format!("Validating {}...", normalize_host(&host)), global.quiet);
    let result = flow
        .submit(UserInput {
            host: host.clone(),
            username,
            password: SecretString::from(password),
        })
        .await;
    pb.finish_and_clear();

    let (title, data) = match result {
        FlowResult::CreateEntry { title, data } => (title, data),
        FlowResult::ShowForm { errors } => {
            let kind = errors.get("base").copied().unwrap_or(FlowErrorKind::Unknown);
            return Err(CliError::SetupFailed {
                host: normalize_host(&host),
                kind: kind.to_string(),
            });
        }
    };

    let mut cfg = config::load_config()?;
    // Re-running setup for a name keeps its entry id, so sensor ids survive.
    let entry = match cfg.entries.get(&args.name) {
        Some(existing) => ConfigEntry::with_id(existing.entry_id.clone(), title, data),
        None => ConfigEntry::new(title, data),
    };

    let store = match args.store {
        Some(s) => s,
        None => choose_store(interactive)?,
    };
    if store == PasswordStore::Keyring {
        config::store_password(&args.name, &entry.data.password)?;
    }

    let mut stored = StoredEntry::from_entry(&entry, store == PasswordStore::Plaintext);
    stored.ca_cert = args.ca_cert;
    cfg.insert_entry(args.name.clone(), stored);
    config::save_config(&cfg)?;

    if !global.quiet {
        eprintln!("✓ {} saved as '{}'", entry.title, args.name);
        eprintln!("  Config: {}", config::config_path().display());
        eprintln!("\n  Try it: zyxly sensors --entry {}", args.name);
    }
    Ok(())
}
