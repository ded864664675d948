//! Firehose metrics definitions.
//!
//! All metrics use OpenTelemetry conventions.
//! They can be exported via OTLP to Prometheus, Grafana, Datadog, etc.

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Central metrics handle for the firehose client.
#[derive(Clone)]
pub struct FirehoseMetrics {
    pub events_decoded: Counter<u64>,
    pub decode_errors: Counter<u64>,
    pub schema_cache_hits: Counter<u64>,
    pub schema_fetches: Counter<u64>,
    pub decode_latency_ms: Histogram<f64>,
}

impl FirehoseMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            events_decoded: meter
                .u64_counter("firehose.events_decoded")
                .with_description("Events decoded and delivered to subscribers")
                .init(),
            decode_errors: meter
                .u64_counter("firehose.decode_errors")
                .with_description("Events dropped because they failed to decode")
                .init(),
            schema_cache_hits: meter
                .u64_counter("firehose.schema_cache_hits")
                .with_description("Schema resolutions answered from the cache")
                .init(),
            schema_fetches: meter
                .u64_counter("firehose.schema_fetches")
                .with_description("ABI fetches issued to the chain API")
                .init(),
            decode_latency_ms: meter
                .f64_histogram("firehose.decode_latency_ms")
                .with_description("Time from envelope receipt to decoded event in milliseconds")
                .init(),
        }
    }

    /// Instruments registered on the global meter provider.
    pub fn global() -> Self {
        Self::new(&global::meter("firehose"))
    }

    pub fn record_decoded(&self, kind: &str) {
        self.events_decoded
            .add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    pub fn record_error(&self, kind: &str, error_type: &str) {
        self.decode_errors.add(
            1,
            &[
                KeyValue::new("kind", kind.to_string()),
                KeyValue::new("error_type", error_type.to_string()),
            ],
        );
    }

    pub fn record_cache_hit(&self, namespace: &str) {
        self.schema_cache_hits
            .add(1, &[KeyValue::new("namespace", namespace.to_string())]);
    }

    pub fn record_fetch(&self, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.schema_fetches
            .add(1, &[KeyValue::new("outcome", outcome)]);
    }

    pub fn record_latency(&self, ms: f64, kind: &str) {
        self.decode_latency_ms
            .record(ms, &[KeyValue::new("kind", kind.to_string())]);
    }
}

impl Default for FirehoseMetrics {
    fn default() -> Self {
        Self::global()
    }
}
