// ── Setup flow ──
//
// Validates user-supplied connection details against the router before
// they become a config entry. The adapter is built through an injected
// factory, so the flow runs unchanged against a fake router in tests.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;
use strum::{AsRefStr, Display};
use tracing::{debug, error, info};

use zyxly_api::RouterAdapter;

use crate::entry::{EntryData, entry_title};

pub const DEFAULT_HOST: &str = "https://192.168.1.1";
pub const DEFAULT_USERNAME: &str = "admin";

const HTTPS: &str = "https://";
const HTTP: &str = "http://";

/// Form values as entered by the user.
#[derive(Debug, Clone)]
pub struct UserInput {
    pub host: String,
    pub username: String,
    pub password: SecretString,
}

impl UserInput {
    /// Defaults for everything but the password.
    pub fn with_password(password: SecretString) -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            username: DEFAULT_USERNAME.to_owned(),
            password,
        }
    }
}

/// Why the form was shown again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowErrorKind {
    /// The router could not be reached or refused the login.
    CannotConnect,
    /// Anything unexpected, including a failure to build the client.
    Unknown,
}

/// Outcome of submitting the form.
#[derive(Debug)]
pub enum FlowResult {
    CreateEntry { title: String, data: EntryData },
    /// Errors keyed by form field; `"base"` applies to the whole form.
    ShowForm {
        errors: BTreeMap<&'static str, FlowErrorKind>,
    },
}

/// Assume HTTPS when the user typed a bare address.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with(HTTP) || host.starts_with(HTTPS) {
        host.to_owned()
    } else {
        format!("{HTTPS}{host}")
    }
}

/// The same host under the other scheme.
pub fn toggle_scheme(host: &str) -> Option<String> {
    if let Some(rest) = host.strip_prefix(HTTPS) {
        Some(format!("{HTTP}{rest}"))
    } else {
        host.strip_prefix(HTTP).map(|rest| format!("{HTTPS}{rest}"))
    }
}

/// Setup flow over adapters built by `F`.
pub struct ConfigFlow<R, F> {
    factory: Arc<F>,
    _router: PhantomData<fn() -> R>,
}

impl<R, F> ConfigFlow<R, F>
where
    R: RouterAdapter,
    F: Fn(&EntryData) -> Result<R, zyxly_api::Error> + Send + Sync + 'static,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            _router: PhantomData,
        }
    }

    /// Check that `data` logs in. Returns the entry title on success.
    ///
    /// Runs on its own task; a panic inside the adapter is reported as
    /// [`FlowErrorKind::Unknown`] rather than unwinding into the caller.
    pub async fn validate_input(&self, data: &EntryData) -> Result<String, FlowErrorKind> {
        let factory = Arc::clone(&self.factory);
        let attempt = data.clone();

        let joined = tokio::spawn(async move {
            let router = factory(&attempt).map_err(|e| {
                error!(host = %attempt.host, error = %e, "could not build router client");
                FlowErrorKind::Unknown
            })?;

            let cannot_connect = |reason: String| {
                error!(host = %attempt.host, %reason, "Unable to connect to Zyxel device");
                FlowErrorKind::CannotConnect
            };

            match router.login().await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(cannot_connect("Login failed - check credentials".into()));
                }
                Err(e) => return Err(cannot_connect(e.to_string())),
            }

            // Logged in but no data still counts as reachable.
            match router.get_status().await {
                Ok(Some(_)) => {}
                Ok(None) => debug!(host = %attempt.host, "login ok, status empty"),
                Err(e) => return Err(cannot_connect(e.to_string())),
            }

            // Best effort: validation should not leave a session open.
            if let Err(e) = router.logout().await {
                debug!(error = %e, "logout after validation failed");
            }
            Ok(())
        })
        .await;

        match joined {
            Ok(Ok(())) => Ok(entry_title(&data.host)),
            Ok(Err(kind)) => Err(kind),
            Err(join) => {
                error!(error = %join, "validation task failed");
                Err(FlowErrorKind::Unknown)
            }
        }
    }

    /// Handle a submitted form.
    ///
    /// The host is normalized first. If validation fails, the same host is
    /// tried once more under the other scheme; the entry keeps whichever
    /// host worked.
    pub async fn submit(&self, input: UserInput) -> FlowResult {
        let mut data = EntryData {
            host: normalize_host(&input.host),
            username: input.username,
            password: input.password,
        };

        let mut result = self.validate_input(&data).await;

        if result.is_err() {
            if let Some(other) = toggle_scheme(&data.host) {
                info!(from = %data.host, to = %other, "retrying with the other scheme");
                let retry = EntryData {
                    host: other,
                    ..data.clone()
                };
                result = self.validate_input(&retry).await;
                if result.is_ok() {
                    data = retry;
                }
            }
        }

        match result {
            Ok(title) => FlowResult::CreateEntry { title, data },
            Err(kind) => FlowResult::ShowForm {
                errors: BTreeMap::from([("base", kind)]),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::coordinator::tests::{FakeRouter, snap};

    fn input(host: &str) -> UserInput {
        UserInput {
            host: host.into(),
            ..UserInput::with_password(SecretString::from("pw".to_string()))
        }
    }

    /// Factory that records each host it is asked for and builds a router
    /// that accepts logins only on `good_host`.
    fn factory(
        good_host: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    ) -> impl Fn(&EntryData) -> Result<FakeRouter, zyxly_api::Error> + Send + Sync + 'static {
        move |data: &EntryData| {
            seen.lock().unwrap().push(data.host.clone());
            let router = FakeRouter::serving(snap(json!({ "device": 1 })));
            if data.host != good_host {
                router.push_login(false);
            }
            Ok(router)
        }
    }

    #[test]
    fn bare_host_gets_https() {
        assert_eq!(normalize_host("192.168.1.1"), "https://192.168.1.1");
        assert_eq!(normalize_host(" 192.168.1.1/ "), "https://192.168.1.1");
        assert_eq!(normalize_host("http://10.0.0.1"), "http://10.0.0.1");
        assert_eq!(normalize_host("https://10.0.0.1"), "https://10.0.0.1");
    }

    #[test]
    fn scheme_toggles_both_ways() {
        assert_eq!(toggle_scheme("https://a").as_deref(), Some("http://a"));
        assert_eq!(toggle_scheme("http://a").as_deref(), Some("https://a"));
        assert_eq!(toggle_scheme("a"), None);
    }

    #[test]
    fn error_kinds_render_as_form_keys() {
        assert_eq!(FlowErrorKind::CannotConnect.as_ref(), "cannot_connect");
        assert_eq!(FlowErrorKind::Unknown.to_string(), "unknown");
    }

    #[test]
    fn defaults_match_the_form() {
        let i = UserInput::with_password(SecretString::from("x".to_string()));
        assert_eq!(i.host, "https://192.168.1.1");
        assert_eq!(i.username, "admin");
    }

    #[tokio::test]
    async fn bare_host_is_normalized_before_validation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let flow = ConfigFlow::new(factory("https://192.168.1.1", Arc::clone(&seen)));

        let FlowResult::CreateEntry { title, data } = flow.submit(input("192.168.1.1")).await else {
            panic!("expected entry");
        };

        assert_eq!(*seen.lock().unwrap(), ["https://192.168.1.1"]);
        assert_eq!(data.host, "https://192.168.1.1");
        assert_eq!(title, "Zyxel device: (https://192.168.1.1)");
    }

    #[tokio::test]
    async fn falls_back_to_http_and_keeps_working_host() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let flow = ConfigFlow::new(factory("http://10.0.0.1", Arc::clone(&seen)));

        let FlowResult::CreateEntry { data, .. } = flow.submit(input("10.0.0.1")).await else {
            panic!("expected entry");
        };

        assert_eq!(*seen.lock().unwrap(), ["https://10.0.0.1", "http://10.0.0.1"]);
        assert_eq!(data.host, "http://10.0.0.1");
    }

    #[tokio::test]
    async fn both_schemes_failing_shows_cannot_connect() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let flow = ConfigFlow::new(factory("nowhere", Arc::clone(&seen)));

        let FlowResult::ShowForm { errors } = flow.submit(input("10.0.0.1")).await else {
            panic!("expected form");
        };

        assert_eq!(errors.get("base"), Some(&FlowErrorKind::CannotConnect));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_status_still_validates() {
        let flow = ConfigFlow::new(|_: &EntryData| -> Result<FakeRouter, zyxly_api::Error> {
            Ok(FakeRouter::default())
        });
        let data = EntryData {
            host: "https://h".into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
        };
        assert!(flow.validate_input(&data).await.is_ok());
    }

    #[tokio::test]
    async fn factory_failure_is_unknown() {
        let flow = ConfigFlow::new(|_: &EntryData| -> Result<FakeRouter, zyxly_api::Error> {
            Err(zyxly_api::Error::Tls("bad ca".into()))
        });

        let FlowResult::ShowForm { errors } = flow.submit(input("h")).await else {
            panic!("expected form");
        };
        assert_eq!(errors["base"], FlowErrorKind::Unknown);
    }

    #[tokio::test]
    async fn transport_error_is_cannot_connect() {
        let flow = ConfigFlow::new(|_: &EntryData| -> Result<FakeRouter, zyxly_api::Error> {
            let r = FakeRouter::default();
            r.push_status(Err(zyxly_api::Error::Api { message: "down".into() }));
            Ok(r)
        });
        let data = EntryData {
            host: "https://h".into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
        };
        assert_eq!(
            flow.validate_input(&data).await,
            Err(FlowErrorKind::CannotConnect)
        );
    }
}
