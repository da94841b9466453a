// Router telemetry and system endpoints
//
// DAL object reads (`/cgi-bin/DAL?oid=…`), the combined status mapping
// the integration polls, and the reboot command.

use serde::Deserialize;
use tracing::debug;

use crate::adapter::Snapshot;
use crate::client::{DAL_SUCCESS, RouterClient};
use crate::error::Error;

/// DAL object carrying cellular radio metrics.
pub const OID_CELLWAN_STATUS: &str = "cellwan_status";
/// DAL object carrying interface byte/packet counters.
pub const OID_TRAFFIC_STATUS: &str = "Traffic_Status";
/// DAL object carrying device identity (model, firmware, serial).
pub const OID_STATUS: &str = "status";

/// The `{ result, Object: [..] }` envelope wrapped around every DAL read.
#[derive(Debug, Deserialize)]
struct DalResponse {
    result: String,
    #[serde(rename = "ReplyMsg", default)]
    reply_msg: Option<String>,
    #[serde(rename = "Object", default)]
    object: Vec<serde_json::Value>,
}

impl RouterClient {
    /// Fetch a single DAL object.
    ///
    /// `GET /cgi-bin/DAL?oid={name}`
    ///
    /// Returns the first element of `Object` when it is a JSON object, and
    /// `None` when the router returned no object at all.
    pub async fn get_json_object(&self, name: &str) -> Result<Option<Snapshot>, Error> {
        let url = self.dal_url(name)?;
        debug!(oid = name, "GET {}", url.path());

        let resp = self.http().get(url).send().await?;
        let body = self.read_body(resp).await?;
        let envelope: DalResponse = Self::parse_json(&body)?;

        if envelope.result != DAL_SUCCESS {
            return Err(Error::Api {
                message: envelope
                    .reply_msg
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("result={}", envelope.result)),
            });
        }

        Ok(envelope.object.into_iter().next().and_then(|v| match v {
            serde_json::Value::Object(map) if !map.is_empty() => Some(map),
            _ => None,
        }))
    }

    /// Fetch the combined status mapping.
    ///
    /// Cellular metrics land under `cellular` and traffic counters under
    /// `traffic`. Returns `None` when the router returned neither.
    pub async fn get_status(&self) -> Result<Option<Snapshot>, Error> {
        debug!("fetching router status");
        let cellular = self.get_json_object(OID_CELLWAN_STATUS).await?;
        let traffic = self.get_json_object(OID_TRAFFIC_STATUS).await?;

        if cellular.is_none() && traffic.is_none() {
            return Ok(None);
        }

        let mut status = Snapshot::new();
        if let Some(c) = cellular {
            status.insert("cellular".into(), serde_json::Value::Object(c));
        }
        if let Some(t) = traffic {
            status.insert("traffic".into(), serde_json::Value::Object(t));
        }
        Ok(Some(status))
    }

    /// Reboot the router.
    ///
    /// `POST /cgi-bin/Reboot?sessionkey=…`
    pub async fn reboot(&self) -> Result<(), Error> {
        let url = self.command_url("/cgi-bin/Reboot")?;
        debug!("rebooting router");
        let resp = self.http().post(url).send().await?;
        let body = self.read_body(resp).await?;

        // Some firmware answers with an empty body, others with a DAL-style result.
        if let Ok(reply) = serde_json::from_str::<DalResponse>(&body) {
            if reply.result != DAL_SUCCESS {
                return Err(Error::Api {
                    message: reply
                        .reply_msg
                        .unwrap_or_else(|| format!("result={}", reply.result)),
                });
            }
        }
        Ok(())
    }
}
