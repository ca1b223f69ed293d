//! Metric instrument factories for sensei-core.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"sensei-core"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for sensei-core instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("sensei-core")
}

/// Counter: number of task instances created.
/// Labels: `method` ("enriched" | "degraded").
pub fn tasks_created() -> Counter<u64> {
    meter()
        .u64_counter("sensei.tasks.created")
        .with_description("Number of task instances created")
        .build()
}

/// Counter: canonical-match outcomes during task creation.
/// Labels: `outcome` ("reused" | "created").
pub fn canonical_matches() -> Counter<u64> {
    meter()
        .u64_counter("sensei.canonical.matches")
        .with_description("Canonical-match outcomes during task creation")
        .build()
}

/// Counter: orphaned instances linked by repair runs.
/// Labels: `project`.
pub fn orphans_linked() -> Counter<u64> {
    meter()
        .u64_counter("sensei.orphans.linked")
        .with_description("Orphaned task instances linked by repair runs")
        .build()
}

/// Counter: similarity-oracle calls.
/// Labels: `model`, `result` ("ok" | "error").
pub fn oracle_calls() -> Counter<u64> {
    meter()
        .u64_counter("sensei.oracle.calls")
        .with_description("Similarity oracle calls")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("sensei.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
