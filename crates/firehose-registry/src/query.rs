//! The chain-query collaborator: where contract ABIs come from.

use async_trait::async_trait;
use firehose_abi::TypeRegistry;
use firehose_core::{Abi, QueryError};

/// Read access to on-chain contract metadata.
///
/// Implementations are network-backed and fallible. The resolver caches
/// what it derives from them, so implementations need not cache.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Fetch the ABI currently deployed on `contract`. An account without
    /// an ABI yields an empty `Abi`, not an error.
    async fn get_abi(&self, contract: &str) -> Result<Abi, QueryError>;

    /// The registered type table of `contract`.
    async fn get_contract_types(&self, contract: &str) -> Result<TypeRegistry, QueryError> {
        let abi = self.get_abi(contract).await?;
        Ok(TypeRegistry::from_abi(&abi))
    }
}
