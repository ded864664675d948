//! Error types for the firehose decode pipeline.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while walking a binary buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("buffer underrun at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid value at offset {offset}: {reason}")]
    InvalidValue { offset: usize, reason: String },

    #[error("unknown type `{type_name}`")]
    UnknownType { type_name: String },

    #[error("type nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    #[error("invalid hex payload: {reason}")]
    InvalidHex { reason: String },

    /// A primitive failure annotated with the field path that was being decoded.
    #[error("failed to decode `{path}` at offset {offset}: {source}")]
    Field {
        path: String,
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// The innermost error, looking through any `Field` annotations.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns `true` if the buffer ran out of bytes.
    pub fn is_underrun(&self) -> bool {
        matches!(self.root_cause(), DecodeError::BufferUnderrun { .. })
    }

    /// Field path of the failing value, if known.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::Field { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Errors raised by the reference encoder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("`{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("`{path}`: missing field")]
    MissingField { path: String },

    #[error("`{path}`: unknown type `{type_name}`")]
    UnknownType { path: String, type_name: String },

    #[error("`{path}`: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("`{path}`: type nesting exceeds {limit} levels")]
    TooDeep { path: String, limit: usize },
}

/// Errors from the chain-query collaborator (ABI fetches).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("chain API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid ABI for `{account}`: {reason}")]
    InvalidAbi { account: String, reason: String },

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("{0}")]
    Other(String),
}

/// Errors from schema resolution.
///
/// Cloneable so that every caller joined on one in-flight resolution
/// receives the same outcome.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("table `{table}` not found in the ABI of `{contract}`")]
    SchemaNotFound { contract: String, table: String },

    #[error("action `{action}` not found in the ABI of `{contract}`")]
    ActionNotFound { contract: String, action: String },

    #[error("failed to fetch the ABI of `{contract}`: {source}")]
    SchemaFetchFailed {
        contract: String,
        #[source]
        source: Arc<QueryError>,
    },
}

/// Errors from the feed transport. Cloneable so they can be broadcast to
/// every error subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection to {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("feed connection closed")]
    Closed,

    #[error("no open feed connection")]
    NotConnected,

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("{0}")]
    Other(String),
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL for `{field}`: {reason}")]
    InvalidUrl { field: String, reason: String },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for one event going through the dispatcher.
#[derive(Debug, Error)]
pub enum FirehoseError {
    #[error("table `{table}` not found in the ABI of `{contract}`")]
    SchemaNotFound { contract: String, table: String },

    #[error("action `{action}` not found in the ABI of `{contract}`")]
    ActionNotFound { contract: String, action: String },

    #[error("failed to fetch the ABI of `{contract}`: {source}")]
    SchemaFetchFailed {
        contract: String,
        #[source]
        source: Arc<QueryError>,
    },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("unknown event kind `{kind}`")]
    UnknownEventKind { kind: String },

    #[error("invalid envelope: {reason}")]
    InvalidEnvelope { reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FirehoseError {
    /// Short, stable label used for metrics and log fields.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FirehoseError::SchemaNotFound { .. } => "schema_not_found",
            FirehoseError::ActionNotFound { .. } => "action_not_found",
            FirehoseError::SchemaFetchFailed { .. } => "schema_fetch_failed",
            FirehoseError::Decode(e) if e.is_underrun() => "buffer_underrun",
            FirehoseError::Decode(_) => "decode_error",
            FirehoseError::UnknownEventKind { .. } => "unknown_event_kind",
            FirehoseError::InvalidEnvelope { .. } => "invalid_envelope",
            FirehoseError::Transport(_) => "transport_error",
        }
    }
}

impl From<ResolveError> for FirehoseError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::SchemaNotFound { contract, table } => {
                FirehoseError::SchemaNotFound { contract, table }
            }
            ResolveError::ActionNotFound { contract, action } => {
                FirehoseError::ActionNotFound { contract, action }
            }
            ResolveError::SchemaFetchFailed { contract, source } => {
                FirehoseError::SchemaFetchFailed { contract, source }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_looks_through_field_wrappers() {
        let err = DecodeError::Field {
            path: "account.balance".into(),
            offset: 4,
            source: Box::new(DecodeError::BufferUnderrun {
                offset: 4,
                needed: 8,
                remaining: 2,
            }),
        };
        assert!(err.is_underrun());
        assert_eq!(err.path(), Some("account.balance"));
        assert!(err.to_string().contains("account.balance"));
    }

    #[test]
    fn resolve_error_maps_onto_pipeline_error() {
        let err: FirehoseError = ResolveError::SchemaNotFound {
            contract: "eosio.token".into(),
            table: "nope".into(),
        }
        .into();
        assert_eq!(err.kind_name(), "schema_not_found");
    }
}
