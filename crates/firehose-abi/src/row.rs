//! Contract-row envelope framing.
//!
//! A `contract_row` payload is:
//!
//! ```text
//! u8       row version
//! name     code (contract account)
//! name     scope
//! name     table
//! [u8; 8]  primary key, big-endian
//! name     payer
//! bytes    row data (varuint32 length + bytes)
//! ```

use crate::buffer::{SerialBuffer, SerialWriter};
use crate::descriptor::TypeDescriptor;
use firehose_core::{AbiValue, DecodeError, DecodedContractRow, EncodeError};

/// The fixed header in front of every contract row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHeader {
    pub version: u8,
    pub code: String,
    pub scope: String,
    pub table: String,
    /// Decimal rendering of the unsigned 64-bit key
    pub primary_key: String,
    pub payer: String,
}

/// Split a contract-row payload into its header and the packed row bytes.
pub fn decode_row_header(bytes: &[u8]) -> Result<(RowHeader, &[u8]), DecodeError> {
    let mut buf = SerialBuffer::new(bytes);
    let version = header_field(&mut buf, "version", |b| b.read_u8())?;
    let code = header_field(&mut buf, "code", |b| b.read_name())?;
    let scope = header_field(&mut buf, "scope", |b| b.read_name())?;
    let table = header_field(&mut buf, "table", |b| b.read_name())?;
    let primary_key = header_field(&mut buf, "primary_key", |b| b.read_primary_key())?;
    let payer = header_field(&mut buf, "payer", |b| b.read_name())?;
    let data = header_field(&mut buf, "data", |b| b.read_blob())?;
    Ok((
        RowHeader {
            version,
            code,
            scope,
            table,
            primary_key,
            payer,
        },
        data,
    ))
}

fn header_field<'a, T>(
    buf: &mut SerialBuffer<'a>,
    field: &str,
    read: impl FnOnce(&mut SerialBuffer<'a>) -> Result<T, DecodeError>,
) -> Result<T, DecodeError> {
    let offset = buf.position();
    read(buf).map_err(|e| DecodeError::Field {
        path: format!("row.{field}"),
        offset,
        source: Box::new(e),
    })
}

/// Decode a full contract-row payload against its table descriptor.
pub fn decode_contract_row(
    block_number: u64,
    header: RowHeader,
    data: &[u8],
    descriptor: &TypeDescriptor,
) -> Result<DecodedContractRow, DecodeError> {
    let fields = descriptor.decode(data)?;
    Ok(DecodedContractRow {
        block_number,
        contract: header.code,
        scope: header.scope,
        table: header.table,
        primary_key: header.primary_key,
        payer: header.payer,
        fields,
    })
}

/// Assemble a contract-row payload from a header and packed row bytes.
pub fn encode_row(header: &RowHeader, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let invalid = |field: &str, reason: String| EncodeError::InvalidValue {
        path: format!("row.{field}"),
        reason,
    };
    let key: u64 = header
        .primary_key
        .parse()
        .map_err(|e| invalid("primary_key", format!("`{}`: {e}", header.primary_key)))?;
    let mut w = SerialWriter::new();
    w.push_u8(header.version);
    for (field, name) in [
        ("code", &header.code),
        ("scope", &header.scope),
        ("table", &header.table),
    ] {
        w.push_name(name).map_err(|e| invalid(field, e.to_string()))?;
    }
    w.push_primary_key(key);
    w.push_name(&header.payer)
        .map_err(|e| invalid("payer", e.to_string()))?;
    w.push_blob(data);
    Ok(w.into_bytes())
}

/// Encode `value` against `descriptor` and frame it as a contract row.
pub fn encode_contract_row(
    header: &RowHeader,
    value: &AbiValue,
    descriptor: &TypeDescriptor,
) -> Result<Vec<u8>, EncodeError> {
    encode_row(header, &descriptor.encode(value)?)
}

/// Decode a hex payload. A leading `0x` is accepted.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = hex_str.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| DecodeError::InvalidHex {
        reason: e.to_string(),
    })
}
