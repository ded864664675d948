//! Rayon-powered offline decoding of contract rows.
//!
//! Rows of a single contract are decoded against one shared type table.
//! Decoding is pure, so rows are independent and split across the pool.

use crate::descriptor::TypeDescriptor;
use crate::registry::TypeRegistry;
use crate::row::{decode_contract_row, decode_row_header, hex_to_bytes};
use firehose_core::{DecodedContractRow, FirehoseError};
use rayon::prelude::*;
use std::sync::Arc;

/// One packed contract row and the block it was observed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowInput {
    pub block_number: u64,
    pub bytes: Vec<u8>,
}

impl RowInput {
    pub fn new(block_number: u64, bytes: Vec<u8>) -> Self {
        Self {
            block_number,
            bytes,
        }
    }

    /// Parse a hex payload.
    pub fn from_hex(block_number: u64, hex_str: &str) -> Result<Self, FirehoseError> {
        Ok(Self::new(block_number, hex_to_bytes(hex_str)?))
    }
}

/// Decode a full contract-row payload against a contract's type table.
///
/// The table named in the row header must be declared by `registry`.
pub fn decode_row(
    block_number: u64,
    bytes: &[u8],
    registry: &Arc<TypeRegistry>,
) -> Result<DecodedContractRow, FirehoseError> {
    let (header, data) = decode_row_header(bytes)?;
    let descriptor = TypeDescriptor::for_table(&header.code, &header.table, registry).ok_or_else(
        || FirehoseError::SchemaNotFound {
            contract: header.code.clone(),
            table: header.table.clone(),
        },
    )?;
    Ok(decode_contract_row(block_number, header, data, &descriptor)?)
}

/// Decode `rows` in parallel. Results keep the input order.
pub fn decode_rows_parallel(
    rows: &[RowInput],
    registry: &Arc<TypeRegistry>,
) -> Vec<Result<DecodedContractRow, FirehoseError>> {
    rows.par_iter()
        .map(|row| decode_row(row.block_number, &row.bytes, registry))
        .collect()
}

/// Split parallel results into `(successes, (index, error))`.
pub fn partition_results(
    results: Vec<Result<DecodedContractRow, FirehoseError>>,
) -> (Vec<DecodedContractRow>, Vec<(usize, FirehoseError)>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, r) in results.into_iter().enumerate() {
        match r {
            Ok(row) => rows.push(row),
            Err(e) => errors.push((idx, e)),
        }
    }
    (rows, errors)
}
