//! In-memory `ChainQuery` implementation.
//!
//! Serves ABIs from a map instead of the network. Suitable for testing,
//! CLI use against ABI files, and replaying recorded feeds. Counts every
//! fetch so callers can assert on deduplication.

use crate::query::ChainQuery;
use async_trait::async_trait;
use firehose_core::{Abi, QueryError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// A chain query backed by a fixed set of ABIs.
#[derive(Debug, Default)]
pub struct StaticChainQuery {
    abis: RwLock<HashMap<String, Abi>>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl StaticChainQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StaticChainQuery::insert`].
    pub fn with_abi(self, contract: impl Into<String>, abi: Abi) -> Self {
        self.insert(contract, abi);
        self
    }

    /// Sleep this long inside every fetch, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Deploy (or replace) the ABI of `contract`.
    pub fn insert(&self, contract: impl Into<String>, abi: Abi) {
        if let Ok(mut abis) = self.abis.write() {
            abis.insert(contract.into(), abi);
        }
    }

    /// While set, every fetch fails with a network-style error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `get_abi` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainQuery for StaticChainQuery {
    async fn get_abi(&self, contract: &str) -> Result<Abi, QueryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueryError::Http(format!(
                "connection refused while fetching `{contract}`"
            )));
        }
        let abis = self
            .abis
            .read()
            .map_err(|_| QueryError::Other("ABI store poisoned".into()))?;
        abis.get(contract)
            .cloned()
            .ok_or_else(|| QueryError::Status {
                status: 500,
                body: format!("unknown key: account `{contract}` does not exist"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_and_counts() {
        let query = StaticChainQuery::new().with_abi("eosio.token", Abi::default());
        assert!(query.get_abi("eosio.token").await.is_ok());
        assert!(matches!(
            query.get_abi("nobody").await,
            Err(QueryError::Status { status: 500, .. })
        ));
        query.set_failing(true);
        assert!(matches!(
            query.get_abi("eosio.token").await,
            Err(QueryError::Http(_))
        ));
        assert_eq!(query.fetch_count(), 3);
    }
}
