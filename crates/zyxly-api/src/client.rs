// Router HTTP client
//
// Wraps `reqwest::Client` with router-specific URL construction, DAL
// envelope unwrapping, and session-key bookkeeping. Endpoint groups
// (auth, system) are implemented as inherent methods in separate files to
// keep this module focused on transport mechanics.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::SecretString;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::adapter::EncryptionMode;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Result code the DAL layer uses for success.
pub(crate) const DAL_SUCCESS: &str = "ZCFG_SUCCESS";

/// Encrypted firmware replies with `{"content": "...", "iv": "..."}`.
#[derive(Deserialize)]
struct EncryptedEnvelope {
    content: Option<String>,
    iv: Option<String>,
}

/// Raw HTTP client for the router's management API.
///
/// Holds the credentials it was constructed with so the session can be
/// re-established lazily; the session key captured at login is attached
/// to the command endpoints that require it.
pub struct RouterClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    /// Session key returned by `/UserLogin`. Required as a query parameter
    /// on logout and reboot.
    session_key: RwLock<Option<String>>,
    /// Set once an encrypted envelope has been seen.
    encrypted: AtomicBool,
}

impl RouterClient {
    /// Create a new client for the router at `host`.
    ///
    /// `host` must carry a scheme (`https://192.168.1.1`). If the transport
    /// config has no cookie jar, one is added: every authenticated call
    /// depends on the session cookie.
    pub fn new(
        host: &str,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(host)?;
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username: username.into(),
            password,
            session_key: RwLock::new(None),
            encrypted: AtomicBool::new(false),
        }
    }

    /// The router base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account name used for login.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Payload wrapping observed so far.
    pub fn encryption(&self) -> EncryptionMode {
        if self.encrypted.load(Ordering::Relaxed) {
            EncryptionMode::Aes
        } else {
            EncryptionMode::Plain
        }
    }

    // ── Session key management ───────────────────────────────────────

    pub(crate) fn set_session_key(&self, key: Option<String>) {
        debug!(present = key.is_some(), "storing session key");
        *self.session_key.write().expect("session key lock poisoned") = key;
    }

    pub(crate) fn session_key(&self) -> Option<String> {
        self.session_key
            .read()
            .expect("session key lock poisoned")
            .clone()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a router path such as `/UserLogin`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Build `{base}/cgi-bin/DAL?oid={oid}`.
    pub(crate) fn dal_url(&self, oid: &str) -> Result<Url, Error> {
        let mut url = self.url("/cgi-bin/DAL")?;
        url.query_pairs_mut().append_pair("oid", oid);
        Ok(url)
    }

    /// Build a command URL carrying the current session key.
    pub(crate) fn command_url(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.url(path)?;
        if let Some(key) = self.session_key() {
            url.query_pairs_mut().append_pair("sessionkey", &key);
        }
        Ok(url)
    }

    // ── Response helpers ─────────────────────────────────────────────

    /// Read a response body, mapping auth statuses and encrypted envelopes.
    pub(crate) async fn read_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let body = resp.text().await?;
        trace!(len = body.len(), "response body received");

        if let Ok(EncryptedEnvelope {
            content: Some(_),
            iv: Some(_),
        }) = serde_json::from_str::<EncryptedEnvelope>(&body)
        {
            self.encrypted.store(true, Ordering::Relaxed);
            return Err(Error::UnsupportedEncryption);
        }

        Ok(body)
    }

    /// Parse a body into `T`, keeping a preview of the body on failure.
    pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(body)),
            body: body.to_owned(),
        })
    }
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> RouterClient {
        RouterClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://192.168.1.1").unwrap(),
            "admin",
            SecretString::from("secret".to_string()),
        )
    }

    #[test]
    fn dal_url_encodes_oid() {
        let url = client().dal_url("cellwan_status").unwrap();
        assert_eq!(
            url.as_str(),
            "https://192.168.1.1/cgi-bin/DAL?oid=cellwan_status"
        );
    }

    #[test]
    fn command_url_without_session_has_no_query() {
        let url = client().command_url("/cgi-bin/Reboot").unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn command_url_carries_session_key() {
        let c = client();
        c.set_session_key(Some("abc123".into()));
        let url = c.command_url("/cgi-bin/Reboot").unwrap();
        assert_eq!(url.query(), Some("sessionkey=abc123"));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert!(preview(&body).len() <= 200);
    }
}
