//! # firehose-core
//!
//! Core types shared by every crate of the firehose client: the wire
//! envelope, the decoded event shapes, the contract ABI model, the
//! structured value produced by the binary decoder, and the error enums
//! used across the decode pipeline.

pub mod abi;
pub mod envelope;
pub mod error;
pub mod event;
pub mod value;

pub use abi::{
    Abi, AbiAction, AbiActionResult, AbiField, AbiStruct, AbiTable, AbiTypeDef, AbiVariant,
};
pub use envelope::{EventKind, PermissionLevel, RawAction, RawEnvelope};
pub use error::{
    ConfigError, DecodeError, EncodeError, FirehoseError, QueryError, ResolveError,
    TransportError,
};
pub use event::{DecodedAction, DecodedActionTrace, DecodedContractRow, DecodedEvent, ForkEvent};
pub use value::AbiValue;
