//! Reference encoder, the inverse of [`crate::decoder::AbiDecoder`].
//!
//! Used to build fixtures and by the CLI; the streaming path only decodes.

use crate::buffer::SerialWriter;
use crate::builtin::BuiltinType;
use crate::decoder::MAX_DEPTH;
use crate::registry::{TypeDef, TypeRegistry};
use firehose_core::{AbiValue, EncodeError};
use indexmap::IndexMap;

pub struct AbiEncoder<'r> {
    registry: &'r TypeRegistry,
    path: Vec<String>,
    depth: usize,
}

impl<'r> AbiEncoder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            path: Vec::new(),
            depth: 0,
        }
    }

    /// Append the encoding of `value` as `type_name` to `w`.
    pub fn encode(
        &mut self,
        w: &mut SerialWriter,
        type_name: &str,
        value: &AbiValue,
    ) -> Result<(), EncodeError> {
        self.path.clear();
        self.path.push(type_name.to_string());
        self.depth = 0;
        self.encode_type(w, type_name, value)
    }

    fn encode_type(
        &mut self,
        w: &mut SerialWriter,
        type_name: &str,
        value: &AbiValue,
    ) -> Result<(), EncodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(EncodeError::TooDeep {
                path: self.path_string(),
                limit: MAX_DEPTH,
            });
        }
        self.depth += 1;
        let result = self.encode_inner(w, type_name, value);
        self.depth -= 1;
        result
    }

    fn encode_inner(
        &mut self,
        w: &mut SerialWriter,
        type_name: &str,
        value: &AbiValue,
    ) -> Result<(), EncodeError> {
        if let Some(inner) = type_name.strip_suffix('$') {
            return self.encode_type(w, inner, value);
        }

        if let Some(inner) = type_name.strip_suffix('?') {
            if value.is_null() {
                w.push_u8(0);
                return Ok(());
            }
            w.push_u8(1);
            return self.encode_type(w, inner, value);
        }

        if let Some(inner) = type_name.strip_suffix("[]") {
            let AbiValue::Array(items) = value else {
                return Err(self.mismatch("array", value));
            };
            let len = u32::try_from(items.len()).map_err(|_| self.invalid("array too long"))?;
            w.push_varuint32(len);
            for (i, item) in items.iter().enumerate() {
                self.path.push(format!("[{i}]"));
                let result = self.encode_type(w, inner, item);
                self.path.pop();
                result?;
            }
            return Ok(());
        }

        if let Some(builtin) = BuiltinType::from_name(type_name) {
            return builtin.write(value, w).map_err(|reason| EncodeError::InvalidValue {
                path: self.path_string(),
                reason,
            });
        }

        let registry = self.registry;
        match registry.get(type_name) {
            Some(TypeDef::Alias(target)) => self.encode_type(w, target, value),
            Some(TypeDef::Struct { .. }) => {
                let AbiValue::Struct(fields) = value else {
                    return Err(self.mismatch("struct", value));
                };
                let mut skipped_extension = false;
                self.encode_fields(w, type_name, fields, &mut skipped_extension)
            }
            Some(TypeDef::Variant(types)) => {
                let (alt, inner) = match value {
                    AbiValue::Variant { type_name, value } => (type_name.as_str(), value.as_ref()),
                    // `["type", value]`, the JSON rendering of a variant
                    AbiValue::Array(pair) if pair.len() == 2 => match pair[0].as_str() {
                        Some(name) => (name, &pair[1]),
                        None => return Err(self.mismatch("variant", value)),
                    },
                    other => return Err(self.mismatch("variant", other)),
                };
                let index = types.iter().position(|t| t == alt).ok_or_else(|| {
                    self.invalid(&format!("`{alt}` is not an alternative of `{type_name}`"))
                })?;
                w.push_varuint32(index as u32);
                self.encode_type(w, alt, inner)
            }
            None => Err(EncodeError::UnknownType {
                path: self.path_string(),
                type_name: type_name.to_string(),
            }),
        }
    }

    fn encode_fields(
        &mut self,
        w: &mut SerialWriter,
        name: &str,
        values: &IndexMap<String, AbiValue>,
        skipped_extension: &mut bool,
    ) -> Result<(), EncodeError> {
        let (base, fields) = match self.resolve_struct(name) {
            Some(TypeDef::Struct { base, fields }) => (base, fields),
            _ => {
                return Err(EncodeError::UnknownType {
                    path: self.path_string(),
                    type_name: name.to_string(),
                })
            }
        };

        if let Some(base) = base {
            if self.depth >= MAX_DEPTH {
                return Err(EncodeError::TooDeep {
                    path: self.path_string(),
                    limit: MAX_DEPTH,
                });
            }
            self.depth += 1;
            let result = self.encode_fields(w, base, values, skipped_extension);
            self.depth -= 1;
            result?;
        }

        for field in fields {
            self.path.push(field.name.clone());
            let result = match values.get(&field.name) {
                None if field.type_name.ends_with('$') => {
                    *skipped_extension = true;
                    Ok(())
                }
                None => Err(EncodeError::MissingField {
                    path: self.path_string(),
                }),
                Some(_) if *skipped_extension => {
                    Err(self.invalid("binary extension follows an omitted one"))
                }
                Some(v) => self.encode_type(w, &field.type_name, v),
            };
            self.path.pop();
            result?;
        }
        Ok(())
    }

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

    fn mismatch(&self, expected: &str, found: &AbiValue) -> EncodeError {
        EncodeError::TypeMismatch {
            path: self.path_string(),
            expected: expected.to_string(),
            found: found.kind_name().to_string(),
        }
    }

    fn invalid(&self, reason: &str) -> EncodeError {
        EncodeError::InvalidValue {
            path: self.path_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldDef;

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.insert(
            "pair",
            TypeDef::Struct {
                base: None,
                fields: vec![
                    FieldDef {
                        name: "key".into(),
                        type_name: "name".into(),
                    },
                    FieldDef {
                        name: "value".into(),
                        type_name: "uint32".into(),
                    },
                ],
            },
        );
        reg
    }

    fn pair(key: &str, value: u64) -> AbiValue {
        let mut fields = IndexMap::new();
        fields.insert("key".to_string(), AbiValue::from(key));
        fields.insert("value".to_string(), AbiValue::Uint(value));
        AbiValue::Struct(fields)
    }

    #[test]
    fn encodes_struct_array() {
        let reg = registry();
        let mut w = SerialWriter::new();
        AbiEncoder::new(&reg)
            .encode(&mut w, "pair[]", &AbiValue::Array(vec![pair("bob", 1)]))
            .unwrap();
        assert_eq!(hex::encode(w.as_slice()), "010000000000000e3d01000000");
    }

    #[test]
    fn missing_field_has_path() {
        let reg = registry();
        let mut fields = IndexMap::new();
        fields.insert("key".to_string(), AbiValue::from("bob"));
        let err = AbiEncoder::new(&reg)
            .encode(&mut SerialWriter::new(), "pair", &AbiValue::Struct(fields))
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::MissingField {
                path: "pair.value".into()
            }
        );
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let reg = registry();
        let err = AbiEncoder::new(&reg)
            .encode(&mut SerialWriter::new(), "pair[]", &AbiValue::Array(vec![pair("bob", 1 << 40)]))
            .unwrap_err();
        assert!(matches!(err, EncodeError::InvalidValue { ref path, .. } if path == "pair[][0].value"));
    }
}
