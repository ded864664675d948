//! Contract interface description (ABI) as published by the chain API.
//!
//! Only the parts needed to walk binary rows and action payloads are
//! modelled; unknown keys (ricardian clauses, error messages, extensions)
//! are ignored on deserialization.

use serde::{Deserialize, Serialize};

/// A contract ABI (`eosio::abi/1.x`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Abi {
    #[serde(default)]
    pub version: String,
    /// Type aliases: `new_type_name` → `type`
    #[serde(default)]
    pub types: Vec<AbiTypeDef>,
    #[serde(default)]
    pub structs: Vec<AbiStruct>,
    #[serde(default)]
    pub actions: Vec<AbiAction>,
    #[serde(default)]
    pub tables: Vec<AbiTable>,
    #[serde(default)]
    pub variants: Vec<AbiVariant>,
    #[serde(default)]
    pub action_results: Vec<AbiActionResult>,
}

impl Abi {
    /// Parse ABI JSON. Accepts either a bare ABI object or a `get_abi`
    /// response wrapping it under an `abi` key.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("abi") {
            Some(inner) if inner.is_object() => serde_json::from_value(inner.clone()),
            _ => serde_json::from_value(value),
        }
    }

    /// Find a table declaration by name.
    pub fn table(&self, name: &str) -> Option<&AbiTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Find an action declaration by name.
    pub fn action(&self, name: &str) -> Option<&AbiAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiTypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiStruct {
    pub name: String,
    /// Empty when the struct has no base
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<AbiField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiAction {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiTable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub index_type: String,
    #[serde(default)]
    pub key_names: Vec<String>,
    #[serde(default)]
    pub key_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiVariant {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiActionResult {
    pub name: String,
    pub result_type: String,
}
