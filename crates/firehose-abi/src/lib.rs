//! # firehose-abi
//!
//! Schema-driven decoder for the Antelope binary serialization format.
//!
//! ## Layers
//! - `buffer`: byte cursor (`SerialBuffer`) and writer (`SerialWriter`)
//! - `name`: 64-bit packed account/table names
//! - `builtin`: the chain's built-in types (integers, assets, timestamps, keys)
//! - `registry`: a contract's registered type table built from its ABI
//! - `decoder` / `encoder`: walk a type name against the type table
//! - `descriptor`: `TypeDescriptor`, the resolved root type of a table or action
//! - `row`: contract-row envelope header
//! - `batch`: parallel offline decoding with rayon
//!
//! Decoding is a pure function of the bytes and the descriptor.

pub mod batch;
pub mod buffer;
pub mod builtin;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod name;
pub mod registry;
pub mod row;

pub use batch::{decode_row, decode_rows_parallel, partition_results, RowInput};
pub use buffer::{SerialBuffer, SerialWriter};
pub use builtin::BuiltinType;
pub use decoder::{AbiDecoder, MAX_DEPTH};
pub use descriptor::TypeDescriptor;
pub use encoder::AbiEncoder;
pub use name::{encode_name, name_to_string, string_to_name, NameError};
pub use registry::{FieldDef, TypeDef, TypeRegistry};
pub use row::{
    decode_contract_row, decode_row_header, encode_contract_row, encode_row, hex_to_bytes,
    RowHeader,
};
