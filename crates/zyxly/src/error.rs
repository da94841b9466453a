//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use zyxly_config::ConfigError;
use zyxly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to router at {url}")]
    #[diagnostic(
        code(zyxly::connection_failed),
        help(
            "Check that the router is reachable from this machine.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Router at {host} is not ready: {reason}")]
    #[diagnostic(
        code(zyxly::not_ready),
        help("The first poll failed. Check the router is up, then retry.")
    )]
    NotReady { host: String, reason: String },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(zyxly::tls_error),
        help("Check the ca_cert path for this entry, or remove it to accept the router's self-signed certificate.")
    )]
    TlsError { reason: String },

    #[error("Router firmware encrypts its API responses")]
    #[diagnostic(
        code(zyxly::unsupported_encryption),
        help("Only firmware with plain JSON responses is supported.")
    )]
    UnsupportedEncryption,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(zyxly::auth_failed),
        help(
            "Verify the username and password.\n\
             Run: zyxly config set-password {entry}"
        )
    )]
    AuthFailed { entry: String },

    #[error("No password configured for entry '{entry}'")]
    #[diagnostic(
        code(zyxly::no_credentials),
        help(
            "Store one with: zyxly config set-password {entry}\n\
             Or set the ZYXLY_PASSWORD environment variable."
        )
    )]
    NoCredentials { entry: String },

    // ── Setup ────────────────────────────────────────────────────────

    #[error("Setup failed for {host}: {kind}")]
    #[diagnostic(
        code(zyxly::setup_failed),
        help(
            "cannot_connect: the router was unreachable on https and http, or rejected the login.\n\
             unknown: the client could not be built; rerun with -vv for details."
        )
    )]
    SetupFailed { host: String, kind: String },

    // ── Entries ──────────────────────────────────────────────────────

    #[error("Entry '{name}' not found in configuration")]
    #[diagnostic(
        code(zyxly::entry_not_found),
        help(
            "Available entries: {available}\n\
             Add one with: zyxly setup --name {name}"
        )
    )]
    EntryNotFound { name: String, available: String },

    #[error("Several entries are configured and none is selected")]
    #[diagnostic(
        code(zyxly::ambiguous_entry),
        help(
            "Available entries: {available}\n\
             Pass --entry <name> or run: zyxly config use <name>"
        )
    )]
    AmbiguousEntry { available: String },

    #[error("No router configured")]
    #[diagnostic(
        code(zyxly::no_config),
        help(
            "Run: zyxly setup\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(zyxly::config))]
    Config { message: String },

    // ── Actions ──────────────────────────────────────────────────────

    #[error("{action} failed: {message}")]
    #[diagnostic(code(zyxly::action_failed))]
    ActionFailed { action: String, message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(zyxly::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(zyxly::validation))]
    Validation { field: String, reason: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(zyxly::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request to the router timed out")]
    #[diagnostic(
        code(zyxly::timeout),
        help("Increase the timeout with --timeout or check the router's responsiveness.")
    )]
    Timeout,

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::NotReady { .. }
            | Self::TlsError { .. }
            | Self::UnsupportedEncryption
            | Self::SetupFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::EntryNotFound { .. } | Self::NoConfig { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::AmbiguousEntry { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active entry name to errors that mention it.
    pub fn for_entry(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { .. } => Self::AuthFailed { entry: name.into() },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message: _ } => CliError::AuthFailed {
                entry: "current".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::UnsupportedEncryption => CliError::UnsupportedEncryption,

            CoreError::NotReady { reason } => CliError::NotReady {
                host: String::new(),
                reason,
            },

            CoreError::UpdateFailed { message } => CliError::ApiError { message },

            CoreError::ActionFailed { action, message } => CliError::ActionFailed {
                action: action.into(),
                message,
            },

            CoreError::EntryNotLoaded { entry_id } | CoreError::EntryAlreadyLoaded { entry_id } => {
                CliError::Config {
                    message: format!("entry {entry_id} is in an unexpected state"),
                }
            }

            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(code) => format!("HTTP {code}: {message}"),
                    None => message,
                },
            },

            CoreError::Config { message } | CoreError::Internal(message) => {
                CliError::Config { message }
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownEntry { name } => CliError::EntryNotFound {
                name,
                available: available_entries(),
            },
            ConfigError::NoEntries => CliError::NoConfig {
                path: zyxly_config::config_path().display().to_string(),
            },
            ConfigError::AmbiguousEntry => CliError::AmbiguousEntry {
                available: available_entries(),
            },
            ConfigError::NoCredentials { entry } => CliError::NoCredentials { entry },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

fn available_entries() -> String {
    let cfg = zyxly_config::load_config_or_default();
    if cfg.entries.is_empty() {
        "(none)".into()
    } else {
        cfg.entries.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

impl From<zyxly_api::Error> for CliError {
    fn from(err: zyxly_api::Error) -> Self {
        match err {
            zyxly_api::Error::Tls(reason) => CliError::TlsError { reason },
            other => CoreError::from(other).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(
            CliError::NoCredentials { entry: "x".into() }.exit_code(),
            exit_code::AUTH
        );
        assert_eq!(
            CliError::from(CoreError::NotReady { reason: "x".into() }).exit_code(),
            exit_code::CONNECTION
        );
        assert_eq!(
            CliError::from(CoreError::Timeout).exit_code(),
            exit_code::TIMEOUT
        );
        assert_eq!(
            CliError::Validation {
                field: "f".into(),
                reason: "r".into()
            }
            .exit_code(),
            exit_code::USAGE
        );
    }

    #[test]
    fn reboot_failure_keeps_action_name() {
        let err = CliError::from(CoreError::ActionFailed {
            action: "reboot",
            message: "refused".into(),
        });
        assert_eq!(err.to_string(), "reboot failed: refused");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn auth_failure_names_entry() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "bad".into(),
        })
        .for_entry("home");
        assert!(matches!(err, CliError::AuthFailed { entry } if entry == "home"));
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn slow_router_reports_timeout() {
        use std::time::Duration;
        use wiremock::matchers::path;
        use wiremock::{Mock, MockServer, ResponseTemplate};
        use zyxly_api::{RouterClient, TransportConfig};

        let server = MockServer::start().await;
        Mock::given(path("/UserLogin"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let transport = TransportConfig::default().with_timeout(Duration::from_millis(100));
        let client = RouterClient::new(
            &server.uri(),
            "admin",
            secrecy::SecretString::from("pw".to_string()),
            &transport,
        )
        .unwrap();

        let err = CliError::from(client.login().await.unwrap_err());
        assert!(matches!(err, CliError::Timeout), "got {err:?}");
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }
}
