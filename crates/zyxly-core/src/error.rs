// ── Core error types ──
//
// Errors surfaced by zyxly-core. Consumers never see HTTP status codes or
// JSON parse failures directly: the `From<zyxly_api::Error>` impl
// translates transport-layer errors, and the coordinator, entry setup, and
// reboot action wrap them into their own failure kinds.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to router at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The HTTP client gave up waiting for the router.
    #[error("Router request timed out")]
    Timeout,

    #[error("Router uses encrypted API responses, which are not supported")]
    UnsupportedEncryption,

    // ── Lifecycle errors ─────────────────────────────────────────────
    /// The first refresh failed; the entry was not set up.
    #[error("Router not ready: {reason}")]
    NotReady { reason: String },

    /// A single refresh cycle failed. The previous snapshot stays cached.
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// An imperative action (reboot) failed. Does not affect polling.
    #[error("Action '{action}' failed: {message}")]
    ActionFailed {
        action: &'static str,
        message: String,
    },

    #[error("Config entry not loaded: {entry_id}")]
    EntryNotLoaded { entry_id: String },

    #[error("Config entry already loaded: {entry_id}")]
    EntryAlreadyLoaded { entry_id: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn update_failed(message: impl Into<String>) -> Self {
        Self::UpdateFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<zyxly_api::Error> for CoreError {
    fn from(err: zyxly_api::Error) -> Self {
        match err {
            zyxly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            zyxly_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            zyxly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            zyxly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            zyxly_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            zyxly_api::Error::Api { message } => CoreError::Api {
                message,
                status: None,
            },
            zyxly_api::Error::UnsupportedEncryption => CoreError::UnsupportedEncryption,
            zyxly_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn session_expired_maps_to_auth_failure() {
        let err = CoreError::from(zyxly_api::Error::SessionExpired);
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn invalid_url_maps_to_config_error() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = CoreError::from(zyxly_api::Error::InvalidUrl(parse_err));
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
