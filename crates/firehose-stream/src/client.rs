//! The application-facing firehose client.
//!
//! Owns the connect/decode/deliver loop. Decoded events are broadcast to
//! every subscriber; transport failures go to a separate error channel.

use crate::config::{request_frame, FirehoseConfig};
use crate::dispatcher::EventDispatcher;
use crate::transport::{FeedConnection, FeedTransport};
use firehose_core::{DecodedEvent, FirehoseError, TransportError};
use firehose_observability::FirehoseMetrics;
use firehose_registry::{ChainQuery, SchemaResolver};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

/// Capacity of the transport error channel.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Snapshot of client counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientMetrics {
    pub events_decoded: u64,
    pub decode_errors: u64,
    pub reconnections: u64,
}

enum Step {
    Event(Result<DecodedEvent, FirehoseError>),
    Failed(TransportError),
}

enum ConnectionEnd {
    Shutdown,
    Closed,
    Failed(TransportError),
}

struct ClientInner {
    config: FirehoseConfig,
    transport: Arc<dyn FeedTransport>,
    dispatcher: Arc<EventDispatcher>,
    events: broadcast::Sender<DecodedEvent>,
    errors: broadcast::Sender<TransportError>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    ready: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
    reconnections: AtomicU64,
}

/// Streaming client for a firehose feed.
///
/// Cloning is cheap; clones drive and observe the same client.
#[derive(Clone)]
pub struct FirehoseClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for FirehoseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirehoseClient")
            .field("endpoint", &self.inner.transport.endpoint())
            .field("ready", &self.is_ready())
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl FirehoseClient {
    pub fn new(
        config: FirehoseConfig,
        transport: Arc<dyn FeedTransport>,
        chain_query: Arc<dyn ChainQuery>,
    ) -> Self {
        let metrics = FirehoseMetrics::global();
        let resolver = SchemaResolver::with_metrics(chain_query, metrics.clone());
        let dispatcher = Arc::new(EventDispatcher::with_metrics(resolver, metrics));
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let (ready, _) = watch::channel(false);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                dispatcher,
                events,
                errors,
                outbound: Mutex::new(None),
                ready,
                shutdown,
                reconnections: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &FirehoseConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }

    /// Receive every event decoded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DecodedEvent> {
        self.inner.events.subscribe()
    }

    /// Receive transport failures (refused connects, dropped connections).
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TransportError> {
        self.inner.errors.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Wait until a feed connection is open. Returns at once if one already is.
    pub async fn ready(&self) {
        let mut rx = self.inner.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Send `{"type": kind, "data": data}` over the open connection.
    pub async fn request(&self, kind: &str, data: Value) -> Result<(), TransportError> {
        let outbound = self
            .inner
            .outbound
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(TransportError::NotConnected)?;
        outbound
            .send(request_frame(kind, &data))
            .await
            .map_err(|_| TransportError::NotConnected)
    }

    /// Stop [`run`](Self::run). In-flight decodes are abandoned.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    pub fn metrics(&self) -> ClientMetrics {
        let stats = self.inner.dispatcher.stats();
        ClientMetrics {
            events_decoded: stats.decoded,
            decode_errors: stats.failed,
            reconnections: self.inner.reconnections.load(Ordering::Relaxed),
        }
    }

    /// Drive the client until shutdown, or until the connection is lost
    /// and the reconnect policy gives up.
    ///
    /// Returns `Ok` on shutdown or when the feed closes cleanly with
    /// reconnection disabled, otherwise the last transport error.
    pub async fn run(&self) -> Result<(), TransportError> {
        let mut shutdown = self.inner.shutdown.subscribe();
        let policy = self.inner.config.reconnect.clone();
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let connected = tokio::select! {
                res = self.inner.transport.connect() => res,
                _ = shutdown.changed() => return Ok(()),
            };

            let last_error = match connected {
                Ok(conn) => {
                    attempt = 0;
                    match self.serve(conn, &mut shutdown).await {
                        ConnectionEnd::Shutdown => return Ok(()),
                        ConnectionEnd::Closed => TransportError::Closed,
                        ConnectionEnd::Failed(e) => e,
                    }
                }
                Err(e) => {
                    warn!(endpoint = self.inner.transport.endpoint(), error = %e, "feed connect failed");
                    e
                }
            };
            let _ = self.inner.errors.send(last_error.clone());

            if !policy.enabled {
                return match last_error {
                    TransportError::Closed => Ok(()),
                    e => Err(e),
                };
            }

            attempt += 1;
            if attempt > policy.max_retries {
                error!(
                    endpoint = self.inner.transport.endpoint(),
                    attempts = attempt - 1,
                    error = %last_error,
                    "giving up on feed connection"
                );
                return Err(last_error);
            }

            let delay = policy.backoff(attempt);
            self.inner.reconnections.fetch_add(1, Ordering::Relaxed);
            info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting to firehose feed"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    /// Pump one connection until it ends or shutdown is requested.
    async fn serve(
        &self,
        conn: FeedConnection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ConnectionEnd {
        let FeedConnection { inbound, outbound } = conn;

        for sub in &self.inner.config.subscriptions {
            if outbound.send(sub.to_frame()).await.is_err() {
                return ConnectionEnd::Failed(TransportError::Closed);
            }
            debug!(kind = %sub.kind, "subscription sent");
        }
        if let Ok(mut slot) = self.inner.outbound.lock() {
            *slot = Some(outbound);
        }
        self.inner.ready.send_replace(true);
        info!(endpoint = self.inner.transport.endpoint(), "firehose feed ready");

        let mut steps = self.decode_stream(inbound);
        let end = loop {
            tokio::select! {
                _ = shutdown.changed() => break ConnectionEnd::Shutdown,
                step = steps.next() => match step {
                    None => break ConnectionEnd::Closed,
                    // no subscribers is not an error
                    Some(Step::Event(Ok(event))) => {
                        let _ = self.inner.events.send(event);
                    }
                    // logged and counted by the dispatcher
                    Some(Step::Event(Err(_))) => {}
                    Some(Step::Failed(e)) => break ConnectionEnd::Failed(e),
                },
            }
        };

        if let Ok(mut slot) = self.inner.outbound.lock() {
            *slot = None;
        }
        self.inner.ready.send_replace(false);
        end
    }

    /// Inbound frames, decoded with up to `max_in_flight` envelopes at once.
    fn decode_stream(
        &self,
        inbound: mpsc::Receiver<Result<String, TransportError>>,
    ) -> BoxStream<'static, Step> {
        let frames = stream::unfold(Some(inbound), |rx| async move {
            let mut rx = rx?;
            match rx.recv().await? {
                Ok(frame) => Some((Ok(frame), Some(rx))),
                Err(e) => Some((Err(e), None)),
            }
        });

        let dispatcher = Arc::clone(&self.inner.dispatcher);
        let pending = frames.map(move |item| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                match item {
                    Ok(frame) => {
                        let task =
                            tokio::spawn(async move { dispatcher.handle_frame(&frame).await });
                        match task.await {
                            Ok(res) => Step::Event(res),
                            Err(e) => Step::Event(Err(FirehoseError::InvalidEnvelope {
                                reason: format!("decode task aborted: {e}"),
                            })),
                        }
                    }
                    Err(e) => Step::Failed(e),
                }
            }
        });

        let limit = self.inner.config.max_in_flight.max(1);
        if self.inner.config.ordered_delivery {
            pending.buffered(limit).boxed()
        } else {
            pending.buffer_unordered(limit).boxed()
        }
    }
}
