//! Decoded event shapes delivered to applications.

use crate::envelope::{EventKind, PermissionLevel, RawEnvelope};
use crate::value::AbiValue;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A contract table row decoded against its table's ABI type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedContractRow {
    #[serde(rename = "block_num")]
    pub block_number: u64,
    /// Contract account owning the table
    #[serde(rename = "code")]
    pub contract: String,
    pub scope: String,
    pub table: String,
    /// Unsigned 64-bit key rendered in decimal; never a JSON number
    pub primary_key: String,
    pub payer: String,
    /// Row fields decoded against the table type
    #[serde(rename = "data")]
    pub fields: AbiValue,
}

/// An action with its arguments decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedAction {
    pub account: String,
    pub name: String,
    pub authorization: Vec<PermissionLevel>,
    pub data: AbiValue,
    /// Keys of the raw action that are passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded action trace, annotated with the transaction status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedActionTrace {
    #[serde(rename = "block_num")]
    pub block_number: u64,
    #[serde(flatten)]
    pub action: DecodedAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A fork notification, passed through unchanged apart from `block_num`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForkEvent {
    pub block_number: u64,
    pub raw: Map<String, Value>,
}

impl ForkEvent {
    pub fn from_envelope(env: &RawEnvelope) -> Self {
        Self {
            block_number: env.block_number,
            raw: env.raw.clone(),
        }
    }
}

impl Serialize for ForkEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stamped = !self.raw.contains_key("block_num");
        let len = self.raw.len() + usize::from(stamped);
        let mut map = serializer.serialize_map(Some(len))?;
        for (k, v) in &self.raw {
            if k == "block_num" {
                map.serialize_entry(k, &self.block_number)?;
            } else {
                map.serialize_entry(k, v)?;
            }
        }
        if stamped {
            map.serialize_entry("block_num", &self.block_number)?;
        }
        map.end()
    }
}

/// The normalized output of the dispatcher. Every variant carries a block number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedEvent {
    ActionTrace(DecodedActionTrace),
    ContractRow(DecodedContractRow),
    Fork(ForkEvent),
}

impl DecodedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DecodedEvent::ActionTrace(_) => EventKind::ActionTrace,
            DecodedEvent::ContractRow(_) => EventKind::ContractRow,
            DecodedEvent::Fork(_) => EventKind::Fork,
        }
    }

    pub fn block_number(&self) -> u64 {
        match self {
            DecodedEvent::ActionTrace(e) => e.block_number,
            DecodedEvent::ContractRow(e) => e.block_number,
            DecodedEvent::Fork(e) => e.block_number,
        }
    }

    /// Normalization step: stamp `block_number` onto the event whatever
    /// branch produced it.
    pub fn stamp_block_number(&mut self, block_number: u64) {
        match self {
            DecodedEvent::ActionTrace(e) => e.block_number = block_number,
            DecodedEvent::ContractRow(e) => e.block_number = block_number,
            DecodedEvent::Fork(e) => e.block_number = block_number,
        }
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
