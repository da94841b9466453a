// ── Router adapter contract ──
//
// Everything above this crate talks to the router through `RouterAdapter`.
// The polling coordinator, the reboot button, and the setup flow are all
// generic over it, which keeps them testable without a live device.

use std::future::Future;

use crate::client::RouterClient;
use crate::error::Error;

/// One telemetry mapping as returned by the router.
///
/// `serde_json` is built with `preserve_order`, so iteration follows the
/// key order of the router's JSON. Entity identity depends on that order
/// being stable.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// How the router wraps its API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMode {
    /// Plain JSON request and response bodies.
    #[default]
    Plain,
    /// Newer firmware wraps bodies in an AES `{content, iv}` envelope.
    Aes,
}

/// Operations the integration needs from a router connection.
///
/// Implementations own their session material (cookies, session key);
/// whether that session is still believed valid is tracked by the caller.
pub trait RouterAdapter: Send + Sync + 'static {
    /// Open a session. `Ok(false)` means the router rejected the credentials.
    fn login(&self) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Close the current session.
    fn logout(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fetch the combined status mapping. `None` when the router returned nothing.
    fn get_status(&self) -> impl Future<Output = Result<Option<Snapshot>, Error>> + Send;

    /// Fetch a single named DAL object.
    fn get_json_object(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Snapshot>, Error>> + Send;

    /// Ask the router to reboot.
    fn reboot(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Payload wrapping observed on this connection.
    fn encryption(&self) -> EncryptionMode;
}

impl RouterAdapter for RouterClient {
    async fn login(&self) -> Result<bool, Error> {
        RouterClient::login(self).await
    }

    async fn logout(&self) -> Result<(), Error> {
        RouterClient::logout(self).await
    }

    async fn get_status(&self) -> Result<Option<Snapshot>, Error> {
        RouterClient::get_status(self).await
    }

    async fn get_json_object(&self, name: &str) -> Result<Option<Snapshot>, Error> {
        RouterClient::get_json_object(self, name).await
    }

    async fn reboot(&self) -> Result<(), Error> {
        RouterClient::reboot(self).await
    }

    fn encryption(&self) -> EncryptionMode {
        RouterClient::encryption(self)
    }
}
