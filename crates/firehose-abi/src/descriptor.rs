//! Resolved type descriptors.

use crate::decoder::AbiDecoder;
use crate::encoder::AbiEncoder;
use crate::registry::TypeRegistry;
use crate::buffer::{SerialBuffer, SerialWriter};
use firehose_core::{AbiValue, DecodeError, EncodeError};
use std::sync::Arc;
use tracing::debug;

/// The schema node that decodes one table's rows (or one action's
/// arguments) of one contract.
///
/// Cheap to clone: the type table is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    contract: String,
    name: String,
    type_name: String,
    registry: Arc<TypeRegistry>,
}

impl TypeDescriptor {
    pub fn new(
        contract: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            contract: contract.into(),
            name: name.into(),
            type_name: type_name.into(),
            registry,
        }
    }

    /// Descriptor for the rows of `table`, if the contract declares it.
    pub fn for_table(contract: &str, table: &str, registry: &Arc<TypeRegistry>) -> Option<Self> {
        let ty = registry.table_type(table)?;
        Some(Self::new(contract, table, ty, Arc::clone(registry)))
    }

    /// Descriptor for the arguments of `action`, if the contract declares it.
    pub fn for_action(contract: &str, action: &str, registry: &Arc<TypeRegistry>) -> Option<Self> {
        let ty = registry.action_type(action)?;
        Some(Self::new(contract, action, ty, Arc::clone(registry)))
    }

    /// Descriptor for the return value of `action`, if it declares one.
    pub fn for_action_result(
        contract: &str,
        action: &str,
        registry: &Arc<TypeRegistry>,
    ) -> Option<Self> {
        let ty = registry.action_result_type(action)?;
        Some(Self::new(contract, action, ty, Arc::clone(registry)))
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Table or action name this descriptor was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root ABI type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Decode `bytes` as one value of the root type.
    ///
    /// Bytes left over after the root value are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<AbiValue, DecodeError> {
        let mut buf = SerialBuffer::new(bytes);
        let value = AbiDecoder::new(&self.registry).decode(&mut buf, &self.type_name)?;
        if !buf.is_empty() {
            debug!(
                contract = %self.contract,
                name = %self.name,
                trailing = buf.remaining(),
                "ignoring trailing bytes after decoded value"
            );
        }
        Ok(value)
    }

    /// Reference encoder: the inverse of [`TypeDescriptor::decode`].
    pub fn encode(&self, value: &AbiValue) -> Result<Vec<u8>, EncodeError> {
        let mut w = SerialWriter::new();
        AbiEncoder::new(&self.registry).encode(&mut w, &self.type_name, value)?;
        Ok(w.into_bytes())
    }
}
