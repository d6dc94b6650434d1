use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Mode, Snapshot};
use crate::{Error, Result};

pub const CORRELATION_ID_LEN: usize = 20;

/// A single hub command. Serializes with the wire's `__type` tag, e.g.
/// `{"__type": "SetAirconOnOff", "airconId": "ac1", "isOn": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type", rename_all_fields = "camelCase")]
pub enum Command {
    GetFullDataEvent,
    SetAirconOnOff { aircon_id: String, is_on: bool },
    SetAirconMode { aircon_id: String, mode: Mode },
    SetAirconHeatTemperature { aircon_id: String, temperature: i64 },
    SetAirconCoolTemperature { aircon_id: String, temperature: i64 },
    SetZoneOpenClose { zone_id: String, is_open: bool },
    SetZoneHeatTemperature { zone_id: String, temperature: i64 },
    SetZoneCoolTemperature { zone_id: String, temperature: i64 },
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    uuid: String,
    body: String,
}

#[derive(Serialize)]
struct CommandBatch<'a> {
    commands: &'a [Command],
}

/// Random 20-char alphanumeric correlation id, one per request.
///
/// The hub answers on the same socket before anything else is sent, so the
/// id is never matched against the response.
fn correlation_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CORRELATION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Frame a command batch as an outgoing envelope text frame.
pub fn encode_envelope(commands: &[Command]) -> Result<String> {
    let body = serde_json::to_string(&CommandBatch { commands })?;
    let envelope = Envelope {
        uuid: correlation_id(),
        body,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse an inbound text frame as a JSON object.
pub fn decode_text(text: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::Protocol(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::Protocol("response is not a JSON object".into()));
    }
    Ok(value)
}

/// Extract and parse the stringified full-state body of a response.
///
/// Fails when the `body` key is absent or the inner document lacks the
/// `aircons`/`zones` maps.
pub fn full_data_body(response: &Value) -> Result<Value> {
    let body = response
        .get("body")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Protocol("response has no body".into()))?;
    let body: Value = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("invalid body JSON: {e}")))?;
    for key in ["aircons", "zones"] {
        if body.get(key).is_none() {
            return Err(Error::Protocol(format!("body has no {key} map")));
        }
    }
    Ok(body)
}

/// Deserialize a full-state body into a [`Snapshot`].
pub fn snapshot_from_body(body: &Value) -> Result<Snapshot> {
    serde_json::from_value(body.clone())
        .map_err(|e| Error::Protocol(format!("malformed full-data body: {e}")))
}
