use thiserror::Error;

/// Top-level error type for the `zyxly-api` crate.
///
/// Covers every failure mode of the router's management API: login,
/// transport, the DAL envelope, and encrypted firmware responses.
/// `zyxly-core` maps these into refresh, setup, and action failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected or the router returned an unusable login reply.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session has expired (cookie expired or revoked).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Router API ──────────────────────────────────────────────────
    /// Non-success `result` in a DAL envelope, or a non-2xx status.
    #[error("Router API error: {message}")]
    Api { message: String },

    /// The firmware answered with an AES-wrapped `{content, iv}` envelope.
    #[error("Router uses encrypted API responses, which this client does not support")]
    UnsupportedEncryption,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_count_as_auth_expired() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(
            Error::Authentication {
                message: "bad password".into()
            }
            .is_auth_expired()
        );
        assert!(!Error::UnsupportedEncryption.is_auth_expired());
    }
}
