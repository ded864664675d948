//! Built-in Antelope ABI types.
//!
//! Every type name the chain library resolves without consulting a
//! contract's type table maps onto one `BuiltinType`. Each variant knows
//! how to read itself from a `SerialBuffer` into an `AbiValue` and how to
//! write an `AbiValue` back out for the reference encoder.

use crate::buffer::{SerialBuffer, SerialWriter};
use crate::name::string_to_name;
use chrono::{DateTime, NaiveDateTime, Utc};
use firehose_core::{error::DecodeError, AbiValue};
use indexmap::IndexMap;
use ripemd::{Digest, Ripemd160};

/// Milliseconds between the Unix epoch and 2000-01-01T00:00:00Z.
const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 946_684_800_000;
const BLOCK_INTERVAL_MS: i64 = 500;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const MAX_ASSET_PRECISION: u8 = 18;
/// Legacy public key prefix; its checksum covers the key data alone.
const LEGACY_KEY_PREFIX: &str = "EOS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int128,
    Uint128,
    VarInt32,
    VarUint32,
    Float32,
    Float64,
    Float128,
    TimePoint,
    TimePointSec,
    BlockTimestamp,
    Name,
    Bytes,
    String,
    Checksum160,
    Checksum256,
    Checksum512,
    Symbol,
    SymbolCode,
    Asset,
    ExtendedAsset,
    PublicKey,
    Signature,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<Self> {
        use BuiltinType::*;
        Some(match name {
            "bool" => Bool,
            "int8" => Int8,
            "uint8" => Uint8,
            "int16" => Int16,
            "uint16" => Uint16,
            "int32" => Int32,
            "uint32" => Uint32,
            "int64" => Int64,
            "uint64" => Uint64,
            "int128" => Int128,
            "uint128" => Uint128,
            "varint32" => VarInt32,
            "varuint32" => VarUint32,
            "float32" => Float32,
            "float64" => Float64,
            "float128" => Float128,
            "time_point" => TimePoint,
            "time_point_sec" => TimePointSec,
            "block_timestamp_type" => BlockTimestamp,
            "name" => Name,
            "bytes" => Bytes,
            "string" => String,
            "checksum160" => Checksum160,
            "checksum256" => Checksum256,
            "checksum512" => Checksum512,
            "symbol" => Symbol,
            "symbol_code" => SymbolCode,
            "asset" => Asset,
            "extended_asset" => ExtendedAsset,
            "public_key" => PublicKey,
            "signature" => Signature,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        use BuiltinType::*;
        match self {
            Bool => "bool",
            Int8 => "int8",
            Uint8 => "uint8",
            Int16 => "int16",
            Uint16 => "uint16",
            Int32 => "int32",
            Uint32 => "uint32",
            Int64 => "int64",
            Uint64 => "uint64",
            Int128 => "int128",
            Uint128 => "uint128",
            VarInt32 => "varint32",
            VarUint32 => "varuint32",
            Float32 => "float32",
            Float64 => "float64",
            Float128 => "float128",
            TimePoint => "time_point",
            TimePointSec => "time_point_sec",
            BlockTimestamp => "block_timestamp_type",
            Name => "name",
            Bytes => "bytes",
            String => "string",
            Checksum160 => "checksum160",
            Checksum256 => "checksum256",
            Checksum512 => "checksum512",
            Symbol => "symbol",
            SymbolCode => "symbol_code",
            Asset => "asset",
            ExtendedAsset => "extended_asset",
            PublicKey => "public_key",
            Signature => "signature",
        }
    }

    /// Decode one value of this type.
    pub fn read(&self, buf: &mut SerialBuffer<'_>) -> Result<AbiValue, DecodeError> {
        use BuiltinType as B;
        let start = buf.position();
        let invalid = |reason: std::string::String| DecodeError::InvalidValue {
            offset: start,
            reason,
        };
        Ok(match self {
            B::Bool => AbiValue::Bool(buf.read_u8()? != 0),
            B::Int8 => AbiValue::Int(i64::from(buf.read_i8()?)),
            B::Uint8 => AbiValue::Uint(u64::from(buf.read_u8()?)),
            B::Int16 => AbiValue::Int(i64::from(buf.read_i16()?)),
            B::Uint16 => AbiValue::Uint(u64::from(buf.read_u16()?)),
            B::Int32 => AbiValue::Int(i64::from(buf.read_i32()?)),
            B::Uint32 => AbiValue::Uint(u64::from(buf.read_u32()?)),
            B::Int64 => AbiValue::BigInt(i128::from(buf.read_i64()?)),
            B::Uint64 => AbiValue::BigUint(u128::from(buf.read_u64()?)),
            B::Int128 => AbiValue::BigInt(buf.read_i128()?),
            B::Uint128 => AbiValue::BigUint(buf.read_u128()?),
            B::VarInt32 => AbiValue::Int(i64::from(buf.read_varint32()?)),
            B::VarUint32 => AbiValue::Uint(u64::from(buf.read_varuint32()?)),
            B::Float32 => AbiValue::Float(f64::from(buf.read_f32()?)),
            B::Float64 => AbiValue::Float(buf.read_f64()?),
            B::Float128 => AbiValue::Bytes(buf.read_bytes(16)?.to_vec()),
            B::TimePoint => {
                let micros = buf.read_i64()?;
                let dt = DateTime::from_timestamp_micros(micros)
                    .ok_or_else(|| invalid(format!("time_point {micros} out of range")))?;
                AbiValue::String(render_time(dt))
            }
            B::TimePointSec => {
                let secs = buf.read_u32()?;
                let dt = DateTime::from_timestamp(i64::from(secs), 0)
                    .ok_or_else(|| invalid(format!("time_point_sec {secs} out of range")))?;
                AbiValue::String(render_time(dt))
            }
            B::BlockTimestamp => {
                let slot = buf.read_u32()?;
                let ms = i64::from(slot) * BLOCK_INTERVAL_MS + BLOCK_TIMESTAMP_EPOCH_MS;
                let dt = DateTime::from_timestamp_millis(ms)
                    .ok_or_else(|| invalid(format!("block timestamp slot {slot} out of range")))?;
                AbiValue::String(render_time(dt))
            }
            B::Name => AbiValue::String(buf.read_name()?),
            B::Bytes => AbiValue::Bytes(buf.read_blob()?.to_vec()),
            B::String => AbiValue::String(buf.read_string()?),
            B::Checksum160 => AbiValue::Bytes(buf.read_bytes(20)?.to_vec()),
            B::Checksum256 => AbiValue::Bytes(buf.read_bytes(32)?.to_vec()),
            B::Checksum512 => AbiValue::Bytes(buf.read_bytes(64)?.to_vec()),
            B::Symbol => {
                let raw = buf.read_u64()?;
                AbiValue::String(format!("{},{}", raw & 0xff, symbol_code_to_string(raw >> 8)))
            }
            B::SymbolCode => AbiValue::String(symbol_code_to_string(buf.read_u64()?)),
            B::Asset => AbiValue::String(read_asset(buf)?),
            B::ExtendedAsset => {
                let mut fields = IndexMap::new();
                fields.insert("quantity".to_string(), AbiValue::String(read_asset(buf)?));
                fields.insert("contract".to_string(), AbiValue::String(buf.read_name()?));
                AbiValue::Struct(fields)
            }
            B::PublicKey => {
                let key_type = KeyType::from_byte(buf.read_u8()?)
                    .ok_or_else(|| invalid("unknown public key type".into()))?;
                let body = buf.position();
                buf.read_bytes(33)?;
                if key_type == KeyType::Wa {
                    buf.read_u8()?;
                    buf.read_blob()?;
                }
                AbiValue::String(key_to_string("PUB", key_type, buf.consumed_since(body)))
            }
            B::Signature => {
                let key_type = KeyType::from_byte(buf.read_u8()?)
                    .ok_or_else(|| invalid("unknown signature type".into()))?;
                let body = buf.position();
                buf.read_bytes(65)?;
                if key_type == KeyType::Wa {
                    buf.read_blob()?;
                    buf.read_blob()?;
                }
                AbiValue::String(key_to_string("SIG", key_type, buf.consumed_since(body)))
            }
        })
    }

    /// Encode one value of this type. Errors are plain messages; the
    /// encoder attaches the field path.
    pub fn write(&self, value: &AbiValue, w: &mut SerialWriter) -> Result<(), String> {
        use BuiltinType as B;
        match self {
            B::Bool => match value {
                AbiValue::Bool(b) => w.push_u8(u8::from(*b)),
                other => return Err(mismatch("bool", other)),
            },
            B::Int8 => w.push_u8(signed::<i8>(value, self)? as u8),
            B::Uint8 => w.push_u8(unsigned::<u8>(value, self)?),
            B::Int16 => w.push_u16(signed::<i16>(value, self)? as u16),
            B::Uint16 => w.push_u16(unsigned::<u16>(value, self)?),
            B::Int32 => w.push_u32(signed::<i32>(value, self)? as u32),
            B::Uint32 => w.push_u32(unsigned::<u32>(value, self)?),
            B::Int64 => w.push_u64(signed::<i64>(value, self)? as u64),
            B::Uint64 => w.push_u64(unsigned::<u64>(value, self)?),
            B::Int128 => w.push_u128(signed::<i128>(value, self)? as u128),
            B::Uint128 => w.push_u128(unsigned::<u128>(value, self)?),
            B::VarInt32 => w.push_varint32(signed::<i32>(value, self)?),
            B::VarUint32 => w.push_varuint32(unsigned::<u32>(value, self)?),
            B::Float32 => w.push_bytes(&(float(value)? as f32).to_le_bytes()),
            B::Float64 => w.push_bytes(&float(value)?.to_le_bytes()),
            B::Float128 => w.push_bytes(&fixed_bytes(value, 16)?),
            B::TimePoint => {
                let dt = parse_time(value)?;
                w.push_u64(dt.timestamp_micros() as u64);
            }
            B::TimePointSec => {
                let secs = u32::try_from(parse_time(value)?.timestamp())
                    .map_err(|_| "time_point_sec out of range".to_string())?;
                w.push_u32(secs);
            }
            B::BlockTimestamp => {
                let ms = parse_time(value)?.timestamp_millis() - BLOCK_TIMESTAMP_EPOCH_MS;
                let slot = u32::try_from(ms / BLOCK_INTERVAL_MS)
                    .map_err(|_| "block_timestamp_type out of range".to_string())?;
                w.push_u32(slot);
            }
            B::Name => w.push_u64(string_to_name(text(value)?).map_err(|e| e.to_string())?),
            B::Bytes => w.push_blob(&bytes(value)?),
            B::String => w.push_string(text(value)?),
            B::Checksum160 => w.push_bytes(&fixed_bytes(value, 20)?),
            B::Checksum256 => w.push_bytes(&fixed_bytes(value, 32)?),
            B::Checksum512 => w.push_bytes(&fixed_bytes(value, 64)?),
            B::Symbol => {
                let (precision, code) = parse_symbol(text(value)?)?;
                w.push_u64((code << 8) | u64::from(precision));
            }
            B::SymbolCode => w.push_u64(string_to_symbol_code(text(value)?)?),
            B::Asset => write_asset(text(value)?, w)?,
            B::ExtendedAsset => {
                let quantity = value
                    .field("quantity")
                    .ok_or_else(|| "extended_asset is missing `quantity`".to_string())?;
                let contract = value
                    .field("contract")
                    .ok_or_else(|| "extended_asset is missing `contract`".to_string())?;
                write_asset(text(quantity)?, w)?;
                w.push_u64(string_to_name(text(contract)?).map_err(|e| e.to_string())?);
            }
            B::PublicKey => write_key(text(value)?, "PUB", 33, w)?,
            B::Signature => write_key(text(value)?, "SIG", 65, w)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    K1,
    R1,
    Wa,
}

impl KeyType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(KeyType::K1),
            1 => Some(KeyType::R1),
            2 => Some(KeyType::Wa),
            _ => None,
        }
    }

    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "K1" => Some(KeyType::K1),
            "R1" => Some(KeyType::R1),
            "WA" => Some(KeyType::Wa),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            KeyType::K1 => "K1",
            KeyType::R1 => "R1",
            KeyType::Wa => "WA",
        }
    }

    fn as_byte(&self) -> u8 {
        match self {
            KeyType::K1 => 0,
            KeyType::R1 => 1,
            KeyType::Wa => 2,
        }
    }
}

/// First four bytes of RIPEMD-160 over the key data and its type suffix.
fn key_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

/// `PUB_K1_<base58(data ‖ checksum)>`, the chain's text form of a key or signature.
fn key_to_string(prefix: &str, key_type: KeyType, data: &[u8]) -> String {
    let mut raw = Vec::with_capacity(data.len() + 4);
    raw.extend_from_slice(data);
    raw.extend_from_slice(&key_checksum(data, key_type.as_str().as_bytes()));
    format!(
        "{prefix}_{}_{}",
        key_type.as_str(),
        bs58::encode(raw).into_string()
    )
}

fn render_time(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_time(value: &AbiValue) -> Result<DateTime<Utc>, String> {
    let s = text(value)?;
    let naive: NaiveDateTime = s
        .trim_end_matches('Z')
        .parse()
        .map_err(|e| format!("invalid timestamp `{s}`: {e}"))?;
    Ok(naive.and_utc())
}

fn symbol_code_to_string(mut raw: u64) -> String {
    let mut out = String::new();
    while raw & 0xff != 0 {
        out.push((raw & 0xff) as u8 as char);
        raw >>= 8;
    }
    out
}

fn string_to_symbol_code(code: &str) -> Result<u64, String> {
    if code.is_empty() || code.len() > 7 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(format!("invalid symbol code `{code}`"));
    }
    Ok(code
        .bytes()
        .rev()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(b)))
}

fn parse_symbol(s: &str) -> Result<(u8, u64), String> {
    let (precision, code) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid symbol `{s}`"))?;
    let precision: u8 = precision
        .trim()
        .parse()
        .map_err(|_| format!("invalid symbol precision in `{s}`"))?;
    if precision > MAX_ASSET_PRECISION {
        return Err(format!("symbol precision {precision} exceeds {MAX_ASSET_PRECISION}"));
    }
    Ok((precision, string_to_symbol_code(code.trim())?))
}

fn read_asset(buf: &mut SerialBuffer<'_>) -> Result<String, DecodeError> {
    let amount = buf.read_i64()?;
    let symbol = buf.read_u64()?;
    Ok(format_asset(
        amount,
        (symbol & 0xff) as u8,
        &symbol_code_to_string(symbol >> 8),
    ))
}

/// Render an asset amount with a fixed number of decimals, e.g. `1.0000 EOS`.
pub fn format_asset(amount: i64, precision: u8, code: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let p = usize::from(precision);
    let number = if p == 0 {
        digits
    } else {
        let padded = format!("{digits:0>width$}", width = p + 1);
        let (int, frac) = padded.split_at(padded.len() - p);
        format!("{int}.{frac}")
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{number} {code}")
}

fn write_asset(s: &str, w: &mut SerialWriter) -> Result<(), String> {
    let (number, code) = s
        .trim()
        .split_once(' ')
        .ok_or_else(|| format!("invalid asset `{s}`"))?;
    let precision = number.split_once('.').map(|(_, f)| f.len()).unwrap_or(0);
    let precision = u8::try_from(precision)
        .ok()
        .filter(|p| *p <= MAX_ASSET_PRECISION)
        .ok_or_else(|| format!("asset precision too large in `{s}`"))?;
    let amount: i64 = number
        .replace('.', "")
        .parse()
        .map_err(|_| format!("invalid asset amount in `{s}`"))?;
    let code = string_to_symbol_code(code.trim())?;
    w.push_u64(amount as u64);
    w.push_u64((code << 8) | u64::from(precision));
    Ok(())
}

fn write_key(s: &str, prefix: &str, fixed_len: usize, w: &mut SerialWriter) -> Result<(), String> {
    let (key_type, body, suffix) = match s.strip_prefix(LEGACY_KEY_PREFIX) {
        Some(body) if prefix == "PUB" => (KeyType::K1, body, ""),
        _ => {
            let mut parts = s.splitn(3, '_');
            let (Some(p), Some(t), Some(body)) = (parts.next(), parts.next(), parts.next()) else {
                return Err(format!("invalid key `{s}`"));
            };
            if p != prefix {
                return Err(format!("expected a {prefix}_ key, found `{s}`"));
            }
            let key_type =
                KeyType::from_prefix(t).ok_or_else(|| format!("unknown key type `{t}`"))?;
            (key_type, body, key_type.as_str())
        }
    };

    let raw = bs58::decode(body)
        .into_vec()
        .map_err(|e| format!("invalid key payload: {e}"))?;
    if raw.len() < 4 {
        return Err(format!("key `{s}` is too short"));
    }
    let (payload, checksum) = raw.split_at(raw.len() - 4);
    if checksum != key_checksum(payload, suffix.as_bytes()).as_slice() {
        return Err(format!("checksum mismatch in key `{s}`"));
    }
    if key_type != KeyType::Wa && payload.len() != fixed_len {
        return Err(format!(
            "{} {prefix} payload must be {fixed_len} bytes, found {}",
            key_type.as_str(),
            payload.len()
        ));
    }
    w.push_u8(key_type.as_byte());
    w.push_bytes(payload);
    Ok(())
}

fn mismatch(expected: &str, found: &AbiValue) -> String {
    format!("expected {expected}, found {}", found.kind_name())
}

fn text(value: &AbiValue) -> Result<&str, String> {
    value.as_str().ok_or_else(|| mismatch("string", value))
}

fn float(value: &AbiValue) -> Result<f64, String> {
    match value {
        AbiValue::Float(f) => Ok(*f),
        other => other
            .as_i128()
            .map(|v| v as f64)
            .ok_or_else(|| mismatch("float", other)),
    }
}

fn bytes(value: &AbiValue) -> Result<Vec<u8>, String> {
    match value {
        AbiValue::Bytes(b) => Ok(b.clone()),
        AbiValue::String(s) => {
            hex::decode(s.trim_start_matches("0x")).map_err(|e| format!("invalid hex: {e}"))
        }
        other => Err(mismatch("bytes", other)),
    }
}

fn fixed_bytes(value: &AbiValue, len: usize) -> Result<Vec<u8>, String> {
    let b = bytes(value)?;
    if b.len() != len {
        return Err(format!("expected {len} bytes, found {}", b.len()));
    }
    Ok(b)
}

fn signed<T: TryFrom<i128>>(value: &AbiValue, ty: &BuiltinType) -> Result<T, String> {
    let v = value
        .as_i128()
        .ok_or_else(|| mismatch(ty.name(), value))?;
    T::try_from(v).map_err(|_| format!("{v} out of range for {}", ty.name()))
}

fn unsigned<T: TryFrom<u128>>(value: &AbiValue, ty: &BuiltinType) -> Result<T, String> {
    let v = value
        .as_u128()
        .ok_or_else(|| mismatch(ty.name(), value))?;
    T::try_from(v).map_err(|_| format!("{v} out of range for {}", ty.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(ty: &str, hex_bytes: &str) -> AbiValue {
        let data = hex::decode(hex_bytes).unwrap();
        let mut buf = SerialBuffer::new(&data);
        let v = BuiltinType::from_name(ty).unwrap().read(&mut buf).unwrap();
        assert!(buf.is_empty(), "{ty} left {} bytes", buf.remaining());
        v
    }

    fn encode(ty: &str, value: &AbiValue) -> String {
        let mut w = SerialWriter::new();
        BuiltinType::from_name(ty).unwrap().write(value, &mut w).unwrap();
        hex::encode(w.as_slice())
    }

    #[test]
    fn every_name_round_trips() {
        for name in [
            "bool", "int8", "uint64", "varuint32", "float128", "time_point",
            "block_timestamp_type", "checksum256", "symbol_code", "extended_asset",
            "public_key", "signature",
        ] {
            assert_eq!(BuiltinType::from_name(name).unwrap().name(), name);
        }
        assert!(BuiltinType::from_name("transfer").is_none());
    }

    #[test]
    fn asset_rendering() {
        // 10000 units of 4,EOS
        let v = decode("asset", "102700000000000004454f5300000000");
        assert_eq!(v, AbiValue::from("1.0000 EOS"));
        assert_eq!(encode("asset", &v), "102700000000000004454f5300000000");
        assert_eq!(format_asset(-5, 4, "EOS"), "-0.0005 EOS");
        assert_eq!(format_asset(42, 0, "NFT"), "42 NFT");
    }

    #[test]
    fn symbol_rendering() {
        assert_eq!(decode("symbol", "04454f5300000000"), AbiValue::from("4,EOS"));
        assert_eq!(encode("symbol", &AbiValue::from("4,EOS")), "04454f5300000000");
        assert_eq!(decode("symbol_code", "454f530000000000"), AbiValue::from("EOS"));
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            decode("time_point_sec", "00105e5f"),
            AbiValue::from("2020-09-13T12:26:40.000")
        );
        assert_eq!(
            decode("block_timestamp_type", "00000000"),
            AbiValue::from("2000-01-01T00:00:00.000")
        );
        assert_eq!(
            decode("block_timestamp_type", "01000000"),
            AbiValue::from("2000-01-01T00:00:00.500")
        );
        assert_eq!(
            encode("time_point_sec", &AbiValue::from("2020-09-13T12:26:40.000")),
            "00105e5f"
        );
        let v = AbiValue::from("2020-09-13T12:26:40.123");
        assert_eq!(decode("time_point", &encode("time_point", &v)), v);
    }

    // eosio development key in both of its text forms
    const DEV_KEY_LEGACY: &str = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
    const DEV_KEY: &str = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63";

    #[test]
    fn public_key_k1() {
        let packed = encode("public_key", &AbiValue::from(DEV_KEY));
        assert_eq!(packed.len(), 68);
        assert!(packed.starts_with("00"));
        assert_eq!(decode("public_key", &packed), AbiValue::from(DEV_KEY));
    }

    #[test]
    fn legacy_public_key_is_accepted() {
        assert_eq!(
            encode("public_key", &AbiValue::from(DEV_KEY_LEGACY)),
            encode("public_key", &AbiValue::from(DEV_KEY))
        );
    }

    #[test]
    fn key_checksum_is_verified() {
        let mut corrupt = DEV_KEY.to_string();
        corrupt.pop();
        corrupt.push('4');
        let err = BuiltinType::PublicKey
            .write(&AbiValue::from(corrupt.as_str()), &mut SerialWriter::new())
            .unwrap_err();
        assert!(err.contains("checksum"), "{err}");
    }

    #[test]
    fn signature_k1_round_trips() {
        let body = "1f".to_string() + &"ab".repeat(64);
        let v = decode("signature", &format!("00{body}"));
        let AbiValue::String(text) = &v else {
            panic!("expected a string, got {v:?}");
        };
        assert!(text.starts_with("SIG_K1_"), "{text}");
        assert!(!text.contains(&body));
        assert_eq!(encode("signature", &v), format!("00{body}"));
    }

    #[test]
    fn unknown_key_type_is_invalid() {
        let data = [7u8; 34];
        let err = BuiltinType::PublicKey
            .read(&mut SerialBuffer::new(&data))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { offset: 0, .. }));
    }

    #[test]
    fn integer_range_is_checked() {
        let mut w = SerialWriter::new();
        let err = BuiltinType::Uint8
            .write(&AbiValue::Uint(300), &mut w)
            .unwrap_err();
        assert!(err.contains("out of range"));
        assert_eq!(encode("int16", &AbiValue::Int(-2)), "feff");
        assert_eq!(encode("uint64", &AbiValue::from("18446744073709551615")), "ffffffffffffffff");
    }
}
