//! Single-flight schema resolver.
//!
//! Resolves `(contract, table)` and `(contract, action)` pairs into
//! `TypeDescriptor`s, fetching the contract ABI on a cache miss.
//!
//! Invariants:
//! - at most one fetch is in flight per key; concurrent callers join it
//! - only successes are cached; `SchemaNotFound` and fetch failures are not
//! - a cached key keeps the descriptor of its first successful resolution

use crate::query::ChainQuery;
use firehose_abi::{hex_to_bytes, TypeDescriptor};
use firehose_core::{AbiValue, DecodedAction, FirehoseError, RawAction, ResolveError};
use firehose_observability::FirehoseMetrics;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace, warn};

/// Keys owned by the enclosing action trace.
const TRACE_KEYS: &[&str] = &["block_num", "status"];

type PendingResolve = Shared<BoxFuture<'static, Result<TypeDescriptor, ResolveError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Namespace {
    Table,
    Action,
}

impl Namespace {
    fn as_str(&self) -> &'static str {
        match self {
            Namespace::Table => "table",
            Namespace::Action => "action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    contract: String,
    namespace: Namespace,
    name: String,
}

impl CacheKey {
    fn new(contract: &str, namespace: Namespace, name: &str) -> Self {
        Self {
            contract: contract.to_string(),
            namespace,
            name: name.to_string(),
        }
    }

    fn not_found(&self) -> ResolveError {
        match self.namespace {
            Namespace::Table => ResolveError::SchemaNotFound {
                contract: self.contract.clone(),
                table: self.name.clone(),
            },
            Namespace::Action => ResolveError::ActionNotFound {
                contract: self.contract.clone(),
                action: self.name.clone(),
            },
        }
    }
}

/// Snapshot of resolver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Callers that joined an in-flight resolution
    pub joined: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    joined: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
}

struct Inner {
    query: Arc<dyn ChainQuery>,
    cache: RwLock<HashMap<CacheKey, TypeDescriptor>>,
    pending: Mutex<HashMap<CacheKey, PendingResolve>>,
    counters: Counters,
    metrics: Option<FirehoseMetrics>,
}

/// Resolves table and action schemas, caching them for the process lifetime.
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct SchemaResolver {
    inner: Arc<Inner>,
}

impl fmt::Debug for SchemaResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaResolver")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SchemaResolver {
    pub fn new(query: Arc<dyn ChainQuery>) -> Self {
        Self::build(query, None)
    }

    /// Resolver that also records OpenTelemetry cache/fetch metrics.
    pub fn with_metrics(query: Arc<dyn ChainQuery>, metrics: FirehoseMetrics) -> Self {
        Self::build(query, Some(metrics))
    }

    fn build(query: Arc<dyn ChainQuery>, metrics: Option<FirehoseMetrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                query,
                cache: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                counters: Counters::default(),
                metrics,
            }),
        }
    }

    /// Descriptor for the rows of `table` in `contract`.
    pub async fn resolve(&self, contract: &str, table: &str) -> Result<TypeDescriptor, ResolveError> {
        self.resolve_key(CacheKey::new(contract, Namespace::Table, table))
            .await
    }

    /// Descriptor for the arguments of `action` on `contract`.
    pub async fn resolve_action(
        &self,
        contract: &str,
        action: &str,
    ) -> Result<TypeDescriptor, ResolveError> {
        self.resolve_key(CacheKey::new(contract, Namespace::Action, action))
            .await
    }

    async fn resolve_key(&self, key: CacheKey) -> Result<TypeDescriptor, ResolveError> {
        if key.contract.is_empty() || key.name.is_empty() {
            return Err(key.not_found());
        }

        if let Some(desc) = self.cached(&key).await {
            return Ok(desc);
        }

        let fut = {
            let mut pending = self.inner.pending.lock().await;
            // a resolution may have completed between the cache read and the lock
            if let Some(desc) = self.cached(&key).await {
                return Ok(desc);
            }
            match pending.get(&key) {
                Some(fut) => {
                    self.inner.counters.joined.fetch_add(1, Ordering::Relaxed);
                    trace!(contract = %key.contract, name = %key.name, "joining in-flight resolution");
                    fut.clone()
                }
                None => {
                    self.inner
                        .counters
                        .cache_misses
                        .fetch_add(1, Ordering::Relaxed);
                    let fut = Self::fetch(Arc::clone(&self.inner), key.clone())
                        .boxed()
                        .shared();
                    pending.insert(key, fut.clone());
                    fut
                }
            }
        };

        fut.await
    }

    async fn cached(&self, key: &CacheKey) -> Option<TypeDescriptor> {
        let desc = self.inner.cache.read().await.get(key).cloned()?;
        self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        if let Some(m) = &self.inner.metrics {
            m.record_cache_hit(key.namespace.as_str());
        }
        trace!(contract = %key.contract, name = %key.name, "schema cache hit");
        Some(desc)
    }

    /// The single fetch behind one pending entry. Caches a success, then
    /// retires the pending entry whatever the outcome.
    async fn fetch(inner: Arc<Inner>, key: CacheKey) -> Result<TypeDescriptor, ResolveError> {
        inner.counters.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(
            contract = %key.contract,
            namespace = key.namespace.as_str(),
            name = %key.name,
            "fetching contract ABI"
        );

        let result = match inner.query.get_contract_types(&key.contract).await {
            Ok(types) => {
                if let Some(m) = &inner.metrics {
                    m.record_fetch(true);
                }
                let types = Arc::new(types);
                let desc = match key.namespace {
                    Namespace::Table => TypeDescriptor::for_table(&key.contract, &key.name, &types),
                    Namespace::Action => {
                        TypeDescriptor::for_action(&key.contract, &key.name, &types)
                    }
                };
                desc.ok_or_else(|| key.not_found())
            }
            Err(e) => {
                inner.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                if let Some(m) = &inner.metrics {
                    m.record_fetch(false);
                }
                warn!(contract = %key.contract, error = %e, "ABI fetch failed");
                Err(ResolveError::SchemaFetchFailed {
                    contract: key.contract.clone(),
                    source: Arc::new(e),
                })
            }
        };

        if let Ok(desc) = &result {
            inner.cache.write().await.insert(key.clone(), desc.clone());
        }
        inner.pending.lock().await.remove(&key);
        result
    }

    /// Expand one action. Hex `data` is decoded against the action's ABI
    /// type; an already-expanded object is passed through.
    pub async fn deserialize_action(&self, action: &RawAction) -> Result<DecodedAction, FirehoseError> {
        let data = match &action.data {
            Value::String(hex_data) => {
                let desc = self.resolve_action(&action.account, &action.name).await?;
                desc.decode(&hex_to_bytes(hex_data)?)?
            }
            other => AbiValue::from_json(other.clone()),
        };
        // stamped by the trace; a raw copy would duplicate them
        let mut extra = action.extra.clone();
        for key in TRACE_KEYS {
            extra.remove(*key);
        }
        Ok(DecodedAction {
            account: action.account.clone(),
            name: action.name.clone(),
            authorization: action.authorization.clone(),
            data,
            extra,
        })
    }

    /// Expand a list of actions, failing on the first error.
    pub async fn deserialize_actions(
        &self,
        actions: &[RawAction],
    ) -> Result<Vec<DecodedAction>, FirehoseError> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            out.push(self.deserialize_action(action).await?);
        }
        Ok(out)
    }

    /// Number of cached descriptors.
    pub async fn cached_len(&self) -> usize {
        self.inner.cache.read().await.len()
    }

    /// `true` if the table descriptor of `(contract, table)` is cached.
    pub async fn is_cached(&self, contract: &str, table: &str) -> bool {
        self.inner
            .cache
            .read()
            .await
            .contains_key(&CacheKey::new(contract, Namespace::Table, table))
    }

    /// Drop every cached descriptor. In-flight resolutions still complete.
    pub async fn clear(&self) {
        self.inner.cache.write().await.clear();
    }

    pub fn stats(&self) -> ResolverStats {
        let c = &self.inner.counters;
        ResolverStats {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            joined: c.joined.load(Ordering::Relaxed),
            fetches: c.fetches.load(Ordering::Relaxed),
            fetch_failures: c.fetch_failures.load(Ordering::Relaxed),
        }
    }
}
