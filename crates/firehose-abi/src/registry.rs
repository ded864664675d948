//! Per-contract registered type table.
//!
//! Built once from an `Abi` and shared behind an `Arc` by every
//! `TypeDescriptor` resolved from that contract.

use crate::builtin::BuiltinType;
use firehose_core::Abi;
use std::collections::HashMap;

/// One named entry of the type table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    /// `new_type_name` → target type (which may carry suffixes)
    Alias(String),
    Struct {
        base: Option<String>,
        fields: Vec<FieldDef>,
    },
    /// Alternatives selected by a varuint32 index
    Variant(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub type_name: String,
}

/// Registered types of one contract plus its table and action bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDef>,
    tables: HashMap<String, String>,
    actions: HashMap<String, String>,
    action_results: HashMap<String, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the type table of a contract ABI.
    ///
    /// Later declarations of a name replace earlier ones.
    pub fn from_abi(abi: &Abi) -> Self {
        let mut reg = Self::new();
        for t in &abi.types {
            reg.insert(&t.new_type_name, TypeDef::Alias(t.ty.clone()));
        }
        for s in &abi.structs {
            let base = (!s.base.is_empty()).then(|| s.base.clone());
            let fields = s
                .fields
                .iter()
                .map(|f| FieldDef {
                    name: f.name.clone(),
                    type_name: f.ty.clone(),
                })
                .collect();
            reg.insert(&s.name, TypeDef::Struct { base, fields });
        }
        for v in &abi.variants {
            reg.insert(&v.name, TypeDef::Variant(v.types.clone()));
        }
        for table in &abi.tables {
            reg.tables.insert(table.name.clone(), table.ty.clone());
        }
        for action in &abi.actions {
            reg.actions.insert(action.name.clone(), action.ty.clone());
        }
        for result in &abi.action_results {
            reg.action_results
                .insert(result.name.clone(), result.result_type.clone());
        }
        reg
    }

    /// Register a type under `name`.
    pub fn insert(&mut self, name: &str, def: TypeDef) {
        self.types.insert(name.to_string(), def);
    }

    /// Bind a table name to its row type.
    pub fn bind_table(&mut self, table: &str, type_name: &str) {
        self.tables.insert(table.to_string(), type_name.to_string());
    }

    /// Bind an action name to its argument type.
    pub fn bind_action(&mut self, action: &str, type_name: &str) {
        self.actions.insert(action.to_string(), type_name.to_string());
    }

    /// Bind an action name to the type of its return value.
    pub fn bind_action_result(&mut self, action: &str, type_name: &str) {
        self.action_results
            .insert(action.to_string(), type_name.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Row type declared for `table`.
    pub fn table_type(&self, table: &str) -> Option<&str> {
        self.tables.get(table).map(String::as_str)
    }

    /// Argument type declared for `action`.
    pub fn action_type(&self, action: &str) -> Option<&str> {
        self.actions.get(action).map(String::as_str)
    }

    /// Return-value type declared for `action`, if it returns one.
    pub fn action_result_type(&self, action: &str) -> Option<&str> {
        self.action_results.get(action).map(String::as_str)
    }

    /// `true` if `name` (ignoring suffixes) is a builtin or registered type.
    pub fn is_known(&self, name: &str) -> bool {
        let base = strip_suffixes(name);
        BuiltinType::from_name(base).is_some() || self.types.contains_key(base)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn strip_suffixes(mut name: &str) -> &str {
    loop {
        if let Some(inner) = name
            .strip_suffix('$')
            .or_else(|| name.strip_suffix('?'))
            .or_else(|| name.strip_suffix("[]"))
        {
            name = inner;
        } else {
            return name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_abi() {
        let abi = Abi::from_json(
            r#"{
                "types": [{"new_type_name": "account_name", "type": "name"}],
                "structs": [
                    {"name": "base", "base": "", "fields": [{"name": "id", "type": "uint64"}]},
                    {"name": "child", "base": "base", "fields": [{"name": "owner", "type": "account_name"}]}
                ],
                "variants": [{"name": "any", "types": ["uint8", "string"]}],
                "tables": [{"name": "things", "type": "child"}],
                "actions": [{"name": "make", "type": "child"}],
                "action_results": [{"name": "make", "result_type": "uint64"}]
            }"#,
        )
        .unwrap();
        let reg = TypeRegistry::from_abi(&abi);
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.table_type("things"), Some("child"));
        assert_eq!(reg.action_type("make"), Some("child"));
        assert_eq!(reg.action_result_type("make"), Some("uint64"));
        assert_eq!(reg.action_result_type("other"), None);
        assert!(matches!(
            reg.get("child"),
            Some(TypeDef::Struct { base: Some(b), .. }) if b == "base"
        ));
        assert!(matches!(reg.get("base"), Some(TypeDef::Struct { base: None, .. })));
        assert!(reg.is_known("account_name[]?"));
        assert!(reg.is_known("asset$"));
        assert!(!reg.is_known("missing"));
    }
}
