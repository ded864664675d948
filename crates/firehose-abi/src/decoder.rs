//! Schema-driven binary decoder.
//!
//! Walks a type name against a `TypeRegistry`:
//! - `T$` binary extension (a struct field omitted once the buffer is exhausted)
//! - `T?` optional: u8 presence flag, then the value
//! - `T[]` array: varuint32 count, then that many values
//! - builtins, aliases, structs (base fields first), variants
//!
//! Every failure is reported as `DecodeError::Field` carrying the dotted
//! path of the value being decoded and the offset it started at.

use crate::buffer::SerialBuffer;
use crate::builtin::BuiltinType;
use crate::registry::{TypeDef, TypeRegistry};
use firehose_core::{AbiValue, DecodeError};
use indexmap::IndexMap;

/// Maximum nesting of aliases, structs, arrays and optionals.
pub const MAX_DEPTH: usize = 32;

pub struct AbiDecoder<'r> {
    registry: &'r TypeRegistry,
    path: Vec<String>,
    depth: usize,
}

impl<'r> AbiDecoder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            path: Vec::new(),
            depth: 0,
        }
    }

    /// Decode one value of `type_name` from `buf`.
    pub fn decode(
        &mut self,
        buf: &mut SerialBuffer<'_>,
        type_name: &str,
    ) -> Result<AbiValue, DecodeError> {
        self.path.clear();
        self.path.push(type_name.to_string());
        self.depth = 0;
        self.decode_type(buf, type_name)
    }

    fn decode_type(
        &mut self,
        buf: &mut SerialBuffer<'_>,
        type_name: &str,
    ) -> Result<AbiValue, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.at(buf.position(), DecodeError::TooDeep { limit: MAX_DEPTH }));
        }
        self.depth += 1;
        let result = self.decode_inner(buf, type_name);
        self.depth -= 1;
        result
    }

    fn decode_inner(
        &mut self,
        buf: &mut SerialBuffer<'_>,
        type_name: &str,
    ) -> Result<AbiValue, DecodeError> {
        let start = buf.position();

        if let Some(inner) = type_name.strip_suffix('$') {
            return self.decode_type(buf, inner);
        }

        if let Some(inner) = type_name.strip_suffix('?') {
            let present = buf.read_u8().map_err(|e| self.at(start, e))?;
            return if present == 0 {
                Ok(AbiValue::Null)
            } else {
                self.decode_type(buf, inner)
            };
        }

        if let Some(inner) = type_name.strip_suffix("[]") {
            let len = buf.read_varuint32().map_err(|e| self.at(start, e))? as usize;
            let mut items = Vec::with_capacity(len.min(buf.remaining()));
            for i in 0..len {
                self.path.push(format!("[{i}]"));
                let item = self.decode_type(buf, inner);
                self.path.pop();
                items.push(item?);
            }
            return Ok(AbiValue::Array(items));
        }

        if let Some(builtin) = BuiltinType::from_name(type_name) {
            return builtin.read(buf).map_err(|e| self.at(start, e));
        }

        let registry = self.registry;
        match registry.get(type_name) {
            Some(TypeDef::Alias(target)) => self.decode_type(buf, target),
            Some(TypeDef::Struct { .. }) => {
                let mut fields = IndexMap::new();
                self.decode_fields(buf, type_name, &mut fields)?;
                Ok(AbiValue::Struct(fields))
            }
            Some(TypeDef::Variant(types)) => {
                let index = buf.read_varuint32().map_err(|e| self.at(start, e))? as usize;
                let alt = types.get(index).ok_or_else(|| {
                    self.at(
                        start,
                        DecodeError::InvalidValue {
                            offset: start,
                            reason: format!(
                                "variant index {index} out of range for `{type_name}` ({} alternatives)",
                                types.len()
                            ),
                        },
                    )
                })?;
                let value = self.decode_type(buf, alt)?;
                Ok(AbiValue::Variant {
                    type_name: alt.clone(),
                    value: Box::new(value),
                })
            }
            None => Err(self.at(
                start,
                DecodeError::UnknownType {
                    type_name: type_name.to_string(),
                },
            )),
        }
    }

    /// Decode the fields of struct `name` (and its bases) into `out`.
    fn decode_fields(
        &mut self,
        buf: &mut SerialBuffer<'_>,
        name: &str,
        out: &mut IndexMap<String, AbiValue>,
    ) -> Result<(), DecodeError> {
        let (base, fields) = match self.resolve_struct(name) {
            Some(TypeDef::Struct { base, fields }) => (base, fields),
            _ => {
                return Err(self.at(
                    buf.position(),
                    DecodeError::UnknownType {
                        type_name: name.to_string(),
                    },
                ))
            }
        };

        if let Some(base) = base {
            if self.depth >= MAX_DEPTH {
                return Err(self.at(buf.position(), DecodeError::TooDeep { limit: MAX_DEPTH }));
            }
            self.depth += 1;
            let result = self.decode_fields(buf, base, out);
            self.depth -= 1;
            result?;
        }

        for field in fields {
            if field.type_name.ends_with('$') && buf.is_empty() {
                continue;
            }
            self.path.push(field.name.clone());
            let value = self.decode_type(buf, &field.type_name);
            self.path.pop();
            out.insert(field.name.clone(), value?);
        }
        Ok(())
    }

    /// Follow aliases until a struct definition is reached.
    fn resolve_struct(&self, name: &str) -> Option<&'r TypeDef> {
        let mut current = name;
        for _ in 0..MAX_DEPTH {
            match self.registry.get(current)? {
                TypeDef::Alias(target) => current = target,
                def @ TypeDef::Struct { .. } => return Some(def),
                TypeDef::Variant(_) => return None,
            }
        }
        None
    }

    fn path_string(&self) -> String {
        let mut out = String::new();
        for seg in &self.path {
            if !out.is_empty() && !seg.starts_with('[') {
                out.push('.');
            }
            out.push_str(seg);
        }
        out
    }

    /// Attach the current path to a primitive failure. Already-annotated
    /// errors pass through untouched so the innermost path wins.
    fn at(&self, offset: usize, err: DecodeError) -> DecodeError {
        match err {
            e @ DecodeError::Field { .. } => e,
            e => DecodeError::Field {
                path: self.path_string(),
                offset,
                source: Box::new(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SerialWriter;
    use crate::registry::FieldDef;

    fn field(name: &str, ty: &str) -> FieldDef {
        FieldDef {
            name: name.into(),
            type_name: ty.into(),
        }
    }

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.insert(
            "account",
            TypeDef::Struct {
                base: None,
                fields: vec![field("balance", "asset")],
            },
        );
        reg.insert(
            "header",
            TypeDef::Struct {
                base: None,
                fields: vec![field("id", "uint64")],
            },
        );
        reg.insert(
            "record",
            TypeDef::Struct {
                base: Some("header".into()),
                fields: vec![
                    field("owner", "name"),
                    field("tags", "string[]"),
                    field("note", "string?"),
                    field("extra", "uint8$"),
                ],
            },
        );
        reg.insert("loop_a", TypeDef::Alias("loop_b".into()));
        reg.insert("loop_b", TypeDef::Alias("loop_a".into()));
        reg.insert("choice", TypeDef::Variant(vec!["uint8".into(), "name".into()]));
        reg
    }

    fn decode(ty: &str, bytes: &[u8]) -> Result<AbiValue, DecodeError> {
        let reg = registry();
        AbiDecoder::new(&reg).decode(&mut SerialBuffer::new(bytes), ty)
    }

    fn record_bytes(with_extension: bool) -> Vec<u8> {
        let mut w = SerialWriter::new();
        w.push_u64(7);
        w.push_name("alice").unwrap();
        w.push_varuint32(2);
        w.push_string("a");
        w.push_string("b");
        w.push_u8(0);
        if with_extension {
            w.push_u8(9);
        }
        w.into_bytes()
    }

    #[test]
    fn base_fields_come_first() {
        let value = decode("record", &record_bytes(true)).unwrap();
        let AbiValue::Struct(fields) = &value else {
            panic!("expected struct, got {value:?}");
        };
        let names: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["id", "owner", "tags", "note", "extra"]);
        assert_eq!(value.field("id"), Some(&AbiValue::BigUint(7)));
        assert_eq!(value.field("note"), Some(&AbiValue::Null));
        assert_eq!(value.field("extra"), Some(&AbiValue::Uint(9)));
    }

    #[test]
    fn missing_binary_extension_is_omitted() {
        let value = decode("record", &record_bytes(false)).unwrap();
        assert!(value.field("extra").is_none());
        assert_eq!(value.field("owner").and_then(AbiValue::as_str), Some("alice"));
    }

    #[test]
    fn underrun_carries_path_and_offset() {
        let bytes = record_bytes(false);
        // cut inside the second tag
        let err = decode("record", &bytes[..20]).unwrap_err();
        assert!(err.is_underrun());
        assert_eq!(err.path(), Some("record.tags[1]"));
        assert!(matches!(err, DecodeError::Field { offset: 19, .. }));
    }

    #[test]
    fn unknown_field_type_is_reported() {
        let mut reg = registry();
        reg.insert(
            "broken",
            TypeDef::Struct {
                base: None,
                fields: vec![field("x", "nosuchtype")],
            },
        );
        let err = AbiDecoder::new(&reg)
            .decode(&mut SerialBuffer::new(&[0u8; 8]), "broken")
            .unwrap_err();
        assert_eq!(err.path(), Some("broken.x"));
        assert!(matches!(
            err.root_cause(),
            DecodeError::UnknownType { type_name } if type_name == "nosuchtype"
        ));
    }

    #[test]
    fn alias_cycles_are_bounded() {
        let err = decode("loop_a", &[]).unwrap_err();
        assert!(matches!(err.root_cause(), DecodeError::TooDeep { limit: MAX_DEPTH }));
    }

    #[test]
    fn variants_are_tagged() {
        let value = decode("choice", &[0x00, 0x05]).unwrap();
        assert_eq!(
            value,
            AbiValue::Variant {
                type_name: "uint8".into(),
                value: Box::new(AbiValue::Uint(5)),
            }
        );
        let err = decode("choice", &[0x07]).unwrap_err();
        assert!(matches!(err.root_cause(), DecodeError::InvalidValue { .. }));
    }
}
