//! Resolver behaviour against an in-memory chain query.

use firehose_core::{Abi, FirehoseError, RawAction, ResolveError};
use firehose_registry::{SchemaResolver, StaticChainQuery};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn token_abi() -> Abi {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/abi/eosio.token.json");
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    Abi::from_json(&json).unwrap()
}

const TRANSFER_HEX: &str = concat!(
    "0000000000855c34",
    "0000000000000e3d",
    "1027000000000000",
    "04454f5300000000",
    "026869"
);

// ─── Single flight ────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_share_one_fetch() {
    let query = Arc::new(
        StaticChainQuery::new()
            .with_abi("eosio.token", token_abi())
            .with_delay(Duration::from_millis(50)),
    );
    let resolver = SchemaResolver::new(query.clone());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("eosio.token", "accounts").await })
        })
        .collect();

    let mut descriptors = Vec::new();
    for handle in handles {
        descriptors.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(query.fetch_count(), 1);
    let first = &descriptors[0];
    assert_eq!(first.type_name(), "account");
    for desc in &descriptors[1..] {
        assert_eq!(desc, first);
        assert!(Arc::ptr_eq(desc.registry(), first.registry()));
    }
    assert!(resolver.is_cached("eosio.token", "accounts").await);
    assert_eq!(resolver.stats().fetches, 1);
}

#[tokio::test]
async fn cached_key_is_served_without_fetching() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query.clone());

    let first = resolver.resolve("eosio.token", "stat").await.unwrap();
    let second = resolver.resolve("eosio.token", "stat").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(query.fetch_count(), 1);
    let stats = resolver.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
}

#[tokio::test]
async fn cached_descriptor_survives_a_redeploy() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query.clone());

    let before = resolver.resolve("eosio.token", "accounts").await.unwrap();
    query.insert("eosio.token", Abi::default());
    let after = resolver.resolve("eosio.token", "accounts").await.unwrap();

    assert_eq!(before, after);
    assert_eq!(query.fetch_count(), 1);
}

// ─── No negative caching ──────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_table_is_not_cached() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query.clone());

    let err = resolver.resolve("eosio.token", "nope").await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::SchemaNotFound { ref contract, ref table }
            if contract == "eosio.token" && table == "nope"
    ));
    assert_eq!(resolver.cached_len().await, 0);

    assert!(resolver.resolve("eosio.token", "nope").await.is_err());
    assert_eq!(query.fetch_count(), 2);
}

#[tokio::test]
async fn fetch_failure_is_retried_on_next_resolve() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    query.set_failing(true);
    let resolver = SchemaResolver::new(query.clone());

    let err = resolver.resolve("eosio.token", "accounts").await.unwrap_err();
    assert!(matches!(err, ResolveError::SchemaFetchFailed { ref contract, .. } if contract == "eosio.token"));
    assert_eq!(resolver.cached_len().await, 0);
    assert_eq!(resolver.stats().fetch_failures, 1);

    query.set_failing(false);
    let desc = resolver.resolve("eosio.token", "accounts").await.unwrap();
    assert_eq!(desc.type_name(), "account");
    assert_eq!(query.fetch_count(), 2);
}

#[tokio::test]
async fn unknown_contract_is_a_fetch_failure() {
    let query = Arc::new(StaticChainQuery::new());
    let resolver = SchemaResolver::new(query);
    let err = resolver.resolve("nobody", "accounts").await.unwrap_err();
    assert!(matches!(err, ResolveError::SchemaFetchFailed { .. }));
}

#[tokio::test]
async fn clear_forces_a_refetch() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query.clone());
    resolver.resolve("eosio.token", "accounts").await.unwrap();
    resolver.clear().await;
    assert_eq!(resolver.cached_len().await, 0);
    resolver.resolve("eosio.token", "accounts").await.unwrap();
    assert_eq!(query.fetch_count(), 2);
}

// ─── Actions ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deserialize_action_decodes_hex_data() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query);

    let action: RawAction = serde_json::from_value(json!({
        "account": "eosio.token",
        "name": "transfer",
        "authorization": [{"actor": "alice", "permission": "active"}],
        "data": TRANSFER_HEX,
    }))
    .unwrap();

    let decoded = resolver.deserialize_action(&action).await.unwrap();
    assert_eq!(decoded.authorization[0].actor, "alice");
    assert_eq!(
        decoded.data.to_json().unwrap(),
        json!({"from": "alice", "to": "bob", "quantity": "1.0000 EOS", "memo": "hi"})
    );
}

#[tokio::test]
async fn deserialize_action_passes_expanded_data_through() {
    let query = Arc::new(StaticChainQuery::new());
    let resolver = SchemaResolver::new(query.clone());

    let action: RawAction = serde_json::from_value(json!({
        "account": "eosio.token",
        "name": "transfer",
        "data": {"from": "alice", "to": "bob"},
    }))
    .unwrap();

    let decoded = resolver.deserialize_action(&action).await.unwrap();
    assert_eq!(decoded.data.to_json().unwrap(), json!({"from": "alice", "to": "bob"}));
    assert_eq!(query.fetch_count(), 0);
}

#[tokio::test]
async fn deserialize_unknown_action_fails() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query);

    let action: RawAction = serde_json::from_value(json!({
        "account": "eosio.token",
        "name": "burn",
        "data": "00",
    }))
    .unwrap();

    let err = resolver.deserialize_action(&action).await.unwrap_err();
    assert!(matches!(err, FirehoseError::ActionNotFound { ref action, .. } if action == "burn"));
}

#[tokio::test]
async fn table_and_action_keys_are_separate() {
    let query = Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()));
    let resolver = SchemaResolver::new(query.clone());

    resolver.resolve("eosio.token", "accounts").await.unwrap();
    resolver.resolve_action("eosio.token", "transfer").await.unwrap();

    assert_eq!(resolver.cached_len().await, 2);
    assert!(!resolver.is_cached("eosio.token", "transfer").await);
    assert_eq!(query.fetch_count(), 2);
}
