//! Event dispatcher: classify an envelope, decode it, normalize it.
//!
//! Every envelope moves through `classify -> (resolve -> decode)? ->
//! normalize`. A failure at any step drops that one event: it is logged
//! with the raw input, counted, and returned as an error. Nothing carries
//! over from one envelope to the next.

use firehose_abi::{decode_contract_row, decode_row_header, hex_to_bytes};
use firehose_core::{
    DecodedActionTrace, DecodedEvent, EventKind, FirehoseError, ForkEvent, RawEnvelope,
};
use firehose_observability::FirehoseMetrics;
use firehose_registry::SchemaResolver;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{error, trace};

/// Decoded/failed event counts of one dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub decoded: u64,
    pub failed: u64,
}

/// Turns raw envelopes into [`DecodedEvent`]s.
pub struct EventDispatcher {
    resolver: SchemaResolver,
    metrics: Option<FirehoseMetrics>,
    decoded: AtomicU64,
    failed: AtomicU64,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("resolver", &self.resolver)
            .field("stats", &self.stats())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new(resolver: SchemaResolver) -> Self {
        Self {
            resolver,
            metrics: None,
            decoded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Dispatcher that also records OpenTelemetry event metrics.
    pub fn with_metrics(resolver: SchemaResolver, metrics: FirehoseMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(resolver)
        }
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    /// Parse a text frame and handle it.
    pub async fn handle_frame(&self, frame: &str) -> Result<DecodedEvent, FirehoseError> {
        match RawEnvelope::parse(frame) {
            Ok(env) => self.handle_envelope(&env).await,
            Err(e) => {
                self.record_failure(None, 0, frame, &e);
                Err(e)
            }
        }
    }

    /// Decode one envelope. Errors are logged and counted here; callers
    /// only decide whether to deliver.
    pub async fn handle_envelope(&self, env: &RawEnvelope) -> Result<DecodedEvent, FirehoseError> {
        let started = Instant::now();
        match self.classify(env).await {
            Ok(mut event) => {
                event.stamp_block_number(env.block_number);
                self.decoded.fetch_add(1, Ordering::Relaxed);
                if let Some(m) = &self.metrics {
                    m.record_decoded(env.kind.as_str());
                    m.record_latency(started.elapsed().as_secs_f64() * 1000.0, env.kind.as_str());
                }
                trace!(kind = %env.kind, block_num = env.block_number, "event decoded");
                Ok(event)
            }
            Err(e) => {
                let raw = Value::Object(env.raw.clone()).to_string();
                self.record_failure(Some(env.kind), env.block_number, &raw, &e);
                Err(e)
            }
        }
    }

    async fn classify(&self, env: &RawEnvelope) -> Result<DecodedEvent, FirehoseError> {
        match env.kind {
            EventKind::ActionTrace => {
                let action = env.action()?;
                let action = self.resolver.deserialize_action(&action).await?;
                Ok(DecodedEvent::ActionTrace(DecodedActionTrace {
                    block_number: env.block_number,
                    action,
                    status: env.status.clone(),
                }))
            }
            EventKind::ContractRow => {
                let bytes = hex_to_bytes(env.payload_hex()?)?;
                let (header, data) = decode_row_header(&bytes)?;
                let descriptor = self.resolver.resolve(&header.code, &header.table).await?;
                let row = decode_contract_row(env.block_number, header, data, &descriptor)?;
                Ok(DecodedEvent::ContractRow(row))
            }
            EventKind::Fork => Ok(DecodedEvent::Fork(ForkEvent::from_envelope(env))),
        }
    }

    fn record_failure(&self, kind: Option<EventKind>, block_number: u64, raw: &str, e: &FirehoseError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let kind = kind.map_or("unknown", |k| k.as_str());
        if let Some(m) = &self.metrics {
            m.record_error(kind, e.kind_name());
        }
        error!(
            kind,
            block_num = block_number,
            error_type = e.kind_name(),
            error = %e,
            raw,
            "dropping event"
        );
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            decoded: self.decoded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
