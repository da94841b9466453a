// Router authentication
//
// Cookie-based session login/logout. `/UserLogin` sets the session cookie
// in the client's jar and returns a `sessionkey` that command endpoints
// expect as a query parameter.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::client::{DAL_SUCCESS, RouterClient};
use crate::error::Error;

/// Reply body of `POST /UserLogin`.
#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    sessionkey: Option<serde_json::Value>,
}

impl LoginReply {
    fn session_key(&self) -> Option<String> {
        match self.sessionkey.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl RouterClient {
    /// Authenticate with the router using the stored username/password.
    ///
    /// `POST /UserLogin` with the password base64-encoded, as the router's
    /// web UI sends it. Returns `Ok(false)` when the router rejects the
    /// credentials; transport failures are errors.
    pub async fn login(&self) -> Result<bool, Error> {
        let url = self.url("/UserLogin")?;
        debug!("logging in at {}", url);

        let encoded = STANDARD.encode(self.password().expose_secret().as_bytes());
        let body = json!({
            "Input_Account": self.username(),
            "Input_Passwd": encoded,
            "currLang": "en",
            "RememberPassword": 0,
            "SHA512_password": false,
        });

        let resp = self.http().post(url).json(&body).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            warn!(%status, "router rejected login");
            self.set_session_key(None);
            return Ok(false);
        }

        let text = self.read_body(resp).await?;
        let reply: LoginReply = Self::parse_json(&text)?;

        if let Some(result) = reply.result.as_deref() {
            if result != DAL_SUCCESS {
                warn!(result, "router rejected login");
                self.set_session_key(None);
                return Ok(false);
            }
        }

        let Some(key) = reply.session_key() else {
            return Err(Error::Authentication {
                message: "login reply did not contain a session key".into(),
            });
        };

        self.set_session_key(Some(key));
        debug!("login successful");
        Ok(true)
    }

    /// End the current session.
    ///
    /// `POST /cgi-bin/UserLogout?sessionkey=…`. The local session key is
    /// dropped even if the router does not answer.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.command_url("/cgi-bin/UserLogout")?;
        debug!("logging out at {}", url.path());

        self.set_session_key(None);
        let resp = self.http().post(url).send().await?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "logout returned non-success status");
        }

        debug!("logout complete");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn session_key_accepts_string_or_number() {
        let reply: LoginReply =
            serde_json::from_str(r#"{"result":"ZCFG_SUCCESS","sessionkey":"k1"}"#).unwrap();
        assert_eq!(reply.session_key().as_deref(), Some("k1"));

        let reply: LoginReply = serde_json::from_str(r#"{"sessionkey":12345}"#).unwrap();
        assert_eq!(reply.session_key().as_deref(), Some("12345"));
    }

    #[test]
    fn empty_session_key_is_missing() {
        let reply: LoginReply = serde_json::from_str(r#"{"sessionkey":""}"#).unwrap();
        assert!(reply.session_key().is_none());
    }
}
