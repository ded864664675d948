//! Raw wire envelopes as delivered by the firehose feed.
//!
//! Every inbound frame is a JSON object
//! `{type: "action_trace"|"contract_row"|"fork", block_num, status?, data}`.
//! `data` is a JSON-encoded action (`action_trace`), a hex string of packed
//! row bytes (`contract_row`), or an arbitrary object (`fork`).

use crate::error::FirehoseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The kind of event an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ActionTrace,
    ContractRow,
    Fork,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ActionTrace => "action_trace",
            EventKind::ContractRow => "contract_row",
            EventKind::Fork => "fork",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = FirehoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action_trace" => Ok(EventKind::ActionTrace),
            "contract_row" => Ok(EventKind::ContractRow),
            "fork" => Ok(EventKind::Fork),
            other => Err(FirehoseError::UnknownEventKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// One inbound message, parsed but not yet decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope {
    pub kind: EventKind,
    pub block_number: u64,
    /// Transaction status for action traces (e.g. `"executed"`)
    pub status: Option<String>,
    /// Kind-specific payload
    pub data: Value,
    /// The full message as received
    pub raw: Map<String, Value>,
}

impl RawEnvelope {
    /// Build an envelope programmatically.
    pub fn new(kind: EventKind, block_number: u64, data: Value) -> Self {
        let mut raw = Map::new();
        raw.insert("type".into(), Value::String(kind.as_str().into()));
        raw.insert("block_num".into(), Value::from(block_number));
        raw.insert("data".into(), data.clone());
        Self {
            kind,
            block_number,
            status: None,
            data,
            raw,
        }
    }

    /// Attach a transaction status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        self.raw
            .insert("status".into(), Value::String(status.clone()));
        self.status = Some(status);
        self
    }

    /// Parse a text frame.
    pub fn parse(frame: &str) -> Result<Self, FirehoseError> {
        let value: Value = serde_json::from_str(frame).map_err(|e| FirehoseError::InvalidEnvelope {
            reason: format!("frame is not valid JSON: {e}"),
        })?;
        Self::from_value(value)
    }

    /// Parse an already-deserialized message.
    pub fn from_value(value: Value) -> Result<Self, FirehoseError> {
        let Value::Object(raw) = value else {
            return Err(FirehoseError::InvalidEnvelope {
                reason: "frame is not a JSON object".into(),
            });
        };

        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| FirehoseError::InvalidEnvelope {
                reason: "missing `type`".into(),
            })?
            .parse::<EventKind>()?;

        let block_number = match raw.get("block_num") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| FirehoseError::InvalidEnvelope {
            reason: "missing or invalid `block_num`".into(),
        })?;

        let status = match raw.get("status") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let data = raw.get("data").cloned().unwrap_or(Value::Null);

        Ok(Self {
            kind,
            block_number,
            status,
            data,
            raw,
        })
    }

    /// The hex payload of a `contract_row` envelope.
    pub fn payload_hex(&self) -> Result<&str, FirehoseError> {
        self.data
            .as_str()
            .ok_or_else(|| FirehoseError::InvalidEnvelope {
                reason: format!("`{}` payload must be a hex string", self.kind),
            })
    }

    /// The action carried by an `action_trace` envelope. `data` may be
    /// a JSON-encoded string or an inline object.
    pub fn action(&self) -> Result<RawAction, FirehoseError> {
        let parsed = match &self.data {
            Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        };
        parsed.map_err(|e| FirehoseError::InvalidEnvelope {
            reason: format!("invalid action payload: {e}"),
        })
    }
}

/// An actor/permission pair authorizing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

/// An action as carried by an `action_trace` envelope.
///
/// `data` is either the hex-encoded packed arguments or an already
/// expanded object. Keys beyond the known ones are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    pub account: String,
    pub name: String,
    #[serde(default)]
    pub authorization: Vec<PermissionLevel>,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
