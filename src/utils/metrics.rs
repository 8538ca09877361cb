//! Metrics instruments.
//!
//! Centralized metric definitions using OpenTelemetry meters. Without an
//! installed meter provider (see `bootstrap`, `otel` feature) all records
//! are no-ops, so call sites never need to care.
//!
//! Naming follows OTel semantic conventions (dot-separated); exporters
//! convert dots to underscores where needed.

use std::sync::LazyLock;

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};

static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("shiptrace"));

/// Events that completed processing, by resulting status and source.
pub static EVENTS_PROCESSED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shiptrace.events.processed")
        .with_description("Tracking events successfully processed")
        .build()
});

/// Events that failed processing, by reason (`shipment_not_found`,
/// `invalid_transition`, `update_failed`, `store_error`).
pub static EVENTS_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shiptrace.events.errors")
        .with_description("Tracking events that failed processing")
        .build()
});

/// Deduplication decisions, by result (`hit` / `miss`).
pub static EVENTS_DEDUP: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shiptrace.events.dedup")
        .with_description("Deduplication checks by result")
        .build()
});

/// Shipments created, by service type.
pub static SHIPMENTS_CREATED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("shiptrace.shipments.created")
        .with_description("Shipments created")
        .build()
});

/// Duration of event processing from dequeue to persistence.
pub static EVENT_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("shiptrace.event.duration")
        .with_description("Event processing duration")
        .with_unit("s")
        .build()
});

/// Events pending in each dispatcher worker queue.
pub static QUEUE_DEPTH: LazyLock<Gauge<u64>> = LazyLock::new(|| {
    METER
        .u64_gauge("shiptrace.queue.depth")
        .with_description("Events pending per dispatcher worker queue")
        .build()
});
