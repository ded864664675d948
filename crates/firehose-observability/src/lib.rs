//! # firehose-observability
//!
//! OpenTelemetry metrics and structured logging for the firehose client.
//!
//! ## Built-in metrics
//! - `firehose.events_decoded`   : counter, tagged with event kind
//! - `firehose.decode_errors`    : counter, tagged with event kind + error type
//! - `firehose.schema_cache_hits`: counter, tagged with namespace
//! - `firehose.schema_fetches`   : counter, tagged with outcome
//! - `firehose.decode_latency_ms`: histogram, tagged with event kind
//!
//! Without an installed OpenTelemetry meter provider every instrument is a
//! no-op, so recording is always safe.
//!
//! ## Structured logging
//! `init_tracing` installs a `tracing-subscriber` registry with an
//! `EnvFilter` built from a global level plus per-component overrides, in
//! text or JSON form.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::FirehoseMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
