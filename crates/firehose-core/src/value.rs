//! The structured value produced by schema-driven binary decoding.
//!
//! Every ABI type decodes into an `AbiValue`, so consumers handle a single
//! representation regardless of the contract that produced the row.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// A decoded, structured value.
///
/// 64- and 128-bit integers are kept in their own variants because they
/// exceed the precision of JSON numbers in most consumers; they always
/// serialize as decimal strings.
#[derive(Debug, Clone, PartialEq)]
pub enum AbiValue {
    Null,
    Bool(bool),
    /// `int8`..`int32` and `varint32`
    Int(i64),
    /// `uint8`..`uint32` and `varuint32`
    Uint(u64),
    /// `int64` and `int128`
    BigInt(i128),
    /// `uint64` and `uint128`
    BigUint(u128),
    Float(f64),
    /// UTF-8 strings and every textual rendering (names, assets, timestamps, keys)
    String(String),
    /// Raw bytes (`bytes`, checksums, `float128`), rendered as lowercase hex
    Bytes(Vec<u8>),
    Array(Vec<AbiValue>),
    /// Struct fields in declared order
    Struct(IndexMap<String, AbiValue>),
    /// A variant alternative, tagged with the alternative's type name
    Variant {
        type_name: String,
        value: Box<AbiValue>,
    },
}

impl AbiValue {
    /// Returns `true` if this value is logically absent.
    pub fn is_null(&self) -> bool {
        matches!(self, AbiValue::Null)
    }

    /// Short label of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AbiValue::Null => "null",
            AbiValue::Bool(_) => "bool",
            AbiValue::Int(_) => "int",
            AbiValue::Uint(_) => "uint",
            AbiValue::BigInt(_) => "bigint",
            AbiValue::BigUint(_) => "biguint",
            AbiValue::Float(_) => "float",
            AbiValue::String(_) => "string",
            AbiValue::Bytes(_) => "bytes",
            AbiValue::Array(_) => "array",
            AbiValue::Struct(_) => "struct",
            AbiValue::Variant { .. } => "variant",
        }
    }

    /// Returns the inner string for `String` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce any integer variant into an `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            AbiValue::Int(v) => Some(i128::from(*v)),
            AbiValue::Uint(v) => Some(i128::from(*v)),
            AbiValue::BigInt(v) => Some(*v),
            AbiValue::BigUint(v) => i128::try_from(*v).ok(),
            AbiValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Coerce any non-negative integer variant into a `u128`.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            AbiValue::Int(v) => u128::try_from(*v).ok(),
            AbiValue::Uint(v) => Some(u128::from(*v)),
            AbiValue::BigInt(v) => u128::try_from(*v).ok(),
            AbiValue::BigUint(v) => Some(*v),
            AbiValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Look up a struct field by name.
    pub fn field(&self, name: &str) -> Option<&AbiValue> {
        match self {
            AbiValue::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Render as a `serde_json::Value`.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Lenient conversion from already-decoded JSON (e.g. action data that
    /// the feed delivered pre-expanded).
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AbiValue::Null,
            Value::Bool(b) => AbiValue::Bool(b),
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    AbiValue::Uint(v)
                } else if let Some(v) = n.as_i64() {
                    AbiValue::Int(v)
                } else {
                    AbiValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => AbiValue::String(s),
            Value::Array(items) => AbiValue::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => AbiValue::Struct(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for AbiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AbiValue::Null => serializer.serialize_none(),
            AbiValue::Bool(b) => serializer.serialize_bool(*b),
            AbiValue::Int(v) => serializer.serialize_i64(*v),
            AbiValue::Uint(v) => serializer.serialize_u64(*v),
            AbiValue::BigInt(v) => serializer.collect_str(v),
            AbiValue::BigUint(v) => serializer.collect_str(v),
            AbiValue::Float(v) => serializer.serialize_f64(*v),
            AbiValue::String(s) => serializer.serialize_str(s),
            AbiValue::Bytes(b) => serializer.serialize_str(&hex::encode(b)),
            AbiValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            AbiValue::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            AbiValue::Variant { type_name, value } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(type_name)?;
                seq.serialize_element(value)?;
                seq.end()
            }
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Null => write!(f, "null"),
            AbiValue::Bool(v) => write!(f, "{v}"),
            AbiValue::Int(v) => write!(f, "{v}"),
            AbiValue::Uint(v) => write!(f, "{v}"),
            AbiValue::BigInt(v) => write!(f, "{v}"),
            AbiValue::BigUint(v) => write!(f, "{v}"),
            AbiValue::Float(v) => write!(f, "{v}"),
            AbiValue::String(s) => write!(f, "{s}"),
            AbiValue::Bytes(b) => write!(f, "{}", hex::encode(b)),
            AbiValue::Array(items) => {
                let parts: Vec<_> = items.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AbiValue::Struct(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            AbiValue::Variant { type_name, value } => write!(f, "{type_name}({value})"),
        }
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        AbiValue::String(s.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(s: String) -> Self {
        AbiValue::String(s)
    }
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        AbiValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_integers_serialize_as_strings() {
        let json = serde_json::to_string(&AbiValue::BigUint(u64::MAX as u128)).unwrap();
        assert_eq!(json, "\"18446744073709551615\"");
        let json = serde_json::to_string(&AbiValue::Uint(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn struct_keeps_declared_order() {
        let mut fields = IndexMap::new();
        fields.insert("zeta".to_string(), AbiValue::Uint(1));
        fields.insert("alpha".to_string(), AbiValue::Bytes(vec![0xab, 0x01]));
        let json = serde_json::to_string(&AbiValue::Struct(fields)).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"ab01"}"#);
    }

    #[test]
    fn variant_renders_as_pair() {
        let v = AbiValue::Variant {
            type_name: "uint8".into(),
            value: Box::new(AbiValue::Uint(3)),
        };
        assert_eq!(v.to_json().unwrap(), serde_json::json!(["uint8", 3]));
    }

    #[test]
    fn from_json_is_lenient() {
        let v = AbiValue::from_json(serde_json::json!({"from": "alice", "n": 5, "neg": -1}));
        assert_eq!(v.field("from").and_then(AbiValue::as_str), Some("alice"));
        assert_eq!(v.field("n"), Some(&AbiValue::Uint(5)));
        assert_eq!(v.field("neg"), Some(&AbiValue::Int(-1)));
    }
}
