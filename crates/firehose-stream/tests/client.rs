//! Client lifecycle against the in-process channel transport.

use firehose_core::{Abi, EventKind, TransportError};
use firehose_registry::StaticChainQuery;
use firehose_stream::{
    ChannelFeedTransport, ClientMetrics, FeedTransport, FirehoseClient, FirehoseConfig,
    ReconnectConfig, Subscription,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

// ─── Helpers ──────────────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

fn token_abi() -> Abi {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/abi/eosio.token.json");
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    Abi::from_json(&json).unwrap()
}

fn query() -> Arc<StaticChainQuery> {
    Arc::new(StaticChainQuery::new().with_abi("eosio.token", token_abi()))
}

fn config(reconnect: bool) -> FirehoseConfig {
    FirehoseConfig {
        server: "ws://feed.test".into(),
        ordered_delivery: true,
        reconnect: ReconnectConfig {
            enabled: reconnect,
            max_retries: 3,
            backoff_ms: 1,
            max_backoff_ms: 4,
        },
        ..FirehoseConfig::default()
    }
}

fn transfer_trace(block_num: u64) -> serde_json::Value {
    json!({
        "type": "action_trace",
        "block_num": block_num,
        "status": "executed",
        "data": json!({
            "account": "eosio.token",
            "name": "transfer",
            "authorization": [],
            "data": "0000000000855c340000000000000e3d102700000000000004454f5300000000026869",
        })
        .to_string(),
    })
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_without_connection_fails() {
    let (transport, _server) = ChannelFeedTransport::new("ws://feed.test");
    let client = FirehoseClient::new(config(false), Arc::new(transport), query());

    assert!(!client.is_ready());
    assert_eq!(
        client.request("get_table_rows", json!({})).await,
        Err(TransportError::NotConnected)
    );
}

#[tokio::test]
async fn streams_decoded_events_end_to_end() {
    let (transport, mut server) = ChannelFeedTransport::new("ws://feed.test");
    let transport = Arc::new(transport);
    let mut cfg = config(false);
    cfg.subscriptions = vec![Subscription::new(
        "get_actions",
        json!({"account": "eosio.token"}),
    )];
    let client = FirehoseClient::new(cfg, transport.clone(), query());
    let mut events = client.subscribe();

    let runner = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });

    let mut conn = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    timeout(WAIT, client.ready()).await.unwrap();
    assert!(client.is_ready());
    assert!(transport.is_connected());

    // configured subscriptions go out first
    assert_eq!(
        conn.next_request().await.unwrap(),
        json!({"type": "get_actions", "data": {"account": "eosio.token"}})
    );
    client
        .request("get_table_rows", json!({"code": "eosio.token"}))
        .await
        .unwrap();
    assert_eq!(
        conn.next_request().await.unwrap(),
        json!({"type": "get_table_rows", "data": {"code": "eosio.token"}})
    );

    // ready() resolves at once when already connected
    timeout(Duration::from_millis(100), client.ready()).await.unwrap();

    assert!(conn.send_json(&json!({"type": "fork", "block_num": 10, "data": {}})).await);
    assert!(conn.send_frame("not json").await);
    assert!(conn.send_json(&transfer_trace(11)).await);

    let first = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(first.kind(), EventKind::Fork);
    assert_eq!(first.block_number(), 10);

    let second = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(second.kind(), EventKind::ActionTrace);
    assert_eq!(second.to_json().unwrap()["status"], "executed");
    assert_eq!(second.to_json().unwrap()["data"]["quantity"], "1.0000 EOS");

    // server hangs up; without reconnection the client stops cleanly
    drop(conn);
    let result = timeout(WAIT, runner).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(!client.is_ready());
    assert_eq!(
        client.metrics(),
        ClientMetrics {
            events_decoded: 2,
            decode_errors: 1,
            reconnections: 0,
        }
    );
    assert_eq!(
        client.request("ping", json!(null)).await,
        Err(TransportError::NotConnected)
    );
}

#[tokio::test]
async fn events_reach_every_subscriber() {
    let (transport, mut server) = ChannelFeedTransport::new("ws://feed.test");
    let client = FirehoseClient::new(config(false), Arc::new(transport), query());
    let mut a = client.subscribe();
    let mut b = client.subscribe();

    let runner = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });
    let conn = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    conn.send_json(&json!({"type": "fork", "block_num": 1, "data": {}}))
        .await;

    assert_eq!(timeout(WAIT, a.recv()).await.unwrap().unwrap().block_number(), 1);
    assert_eq!(timeout(WAIT, b.recv()).await.unwrap().unwrap().block_number(), 1);

    client.shutdown();
    assert!(timeout(WAIT, runner).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn unordered_delivery_delivers_everything() {
    let (transport, mut server) = ChannelFeedTransport::new("ws://feed.test");
    let mut cfg = config(false);
    cfg.ordered_delivery = false;
    cfg.max_in_flight = 4;
    let client = FirehoseClient::new(cfg, Arc::new(transport), query());
    let mut events = client.subscribe();

    let runner = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });
    let conn = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    for block in 0..20u64 {
        conn.send_json(&json!({"type": "fork", "block_num": block, "data": {}}))
            .await;
    }

    let mut blocks = Vec::new();
    for _ in 0..20 {
        blocks.push(timeout(WAIT, events.recv()).await.unwrap().unwrap().block_number());
    }
    blocks.sort_unstable();
    assert_eq!(blocks, (0..20).collect::<Vec<_>>());

    client.shutdown();
    assert!(timeout(WAIT, runner).await.unwrap().unwrap().is_ok());
}

// ─── Reconnection ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reconnects_after_refused_connects() {
    let (transport, mut server) = ChannelFeedTransport::new("ws://feed.test");
    transport.refuse_next(2);
    let transport = Arc::new(transport);
    let client = FirehoseClient::new(config(true), transport.clone(), query());
    let mut errors = client.subscribe_errors();

    let runner = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });

    let _conn = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    timeout(WAIT, client.ready()).await.unwrap();

    assert_eq!(transport.connect_count(), 3);
    assert_eq!(client.metrics().reconnections, 2);
    for _ in 0..2 {
        let err = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    client.shutdown();
    assert!(timeout(WAIT, runner).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn reconnects_after_a_dropped_connection() {
    let (transport, mut server) = ChannelFeedTransport::new("ws://feed.test");
    let client = FirehoseClient::new(config(true), Arc::new(transport), query());
    let mut events = client.subscribe();

    let runner = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });

    let conn = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    conn.fail(TransportError::WebSocket("reset by peer".into())).await;

    let conn = timeout(WAIT, server.accept()).await.unwrap().unwrap();
    conn.send_json(&json!({"type": "fork", "block_num": 42, "data": {}}))
        .await;
    assert_eq!(timeout(WAIT, events.recv()).await.unwrap().unwrap().block_number(), 42);
    assert_eq!(client.metrics().reconnections, 1);

    client.shutdown();
    assert!(timeout(WAIT, runner).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let (transport, _server) = ChannelFeedTransport::new("ws://feed.test");
    transport.refuse_next(100);
    let transport = Arc::new(transport);
    let client = FirehoseClient::new(config(true), transport.clone(), query());

    let err = timeout(WAIT, client.run()).await.unwrap().unwrap_err();

    assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    // first attempt plus `max_retries` retries
    assert_eq!(transport.connect_count(), 4);
    assert_eq!(client.metrics().reconnections, 3);
}

#[tokio::test]
async fn connect_failure_without_reconnect_is_returned() {
    let (transport, _server) = ChannelFeedTransport::new("ws://feed.test");
    transport.refuse_next(1);
    let client = FirehoseClient::new(config(false), Arc::new(transport), query());
    let err = timeout(WAIT, client.run()).await.unwrap().unwrap_err();
    assert!(matches!(err, TransportError::ConnectionFailed { .. }));
}
