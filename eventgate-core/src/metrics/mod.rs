//! Metrics for admission, denials and blocks
//!
//! Everything goes through the `metrics` facade; without an installed
//! recorder the calls are no-ops.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const JOIN_ADMITTED: &str = "admission.join.admitted";
pub const JOIN_REJECTED: &str = "admission.join.rejected";
pub const LEAVE_TOTAL: &str = "admission.leave.total";
pub const ACCESS_DENIED: &str = "access.denied";
pub const BLOCKS_CREATED: &str = "blocks.created";
pub const BLOCKS_REMOVED: &str = "blocks.removed";
pub const BLOCK_FILTERED: &str = "blocks.filtered_items";
pub const STORE_FAILURES: &str = "store.failures";
pub const ADMIT_DURATION_MS: &str = "store.admit.duration_ms";

/// Register descriptions for every metric the core emits
pub fn init_metrics() {
    describe_counter!(JOIN_ADMITTED, "Joins that inserted a participation row");
    describe_counter!(
        JOIN_REJECTED,
        "Joins rejected, labelled by reason (permission, full, duplicate, not_found)"
    );
    describe_counter!(LEAVE_TOTAL, "Participation rows removed by leave");
    describe_counter!(ACCESS_DENIED, "View or join decisions that denied access");
    describe_counter!(BLOCKS_CREATED, "Block edges created");
    describe_counter!(BLOCKS_REMOVED, "Block edges removed");
    describe_counter!(
        BLOCK_FILTERED,
        "Events or participants dropped from results because of a block"
    );
    describe_counter!(STORE_FAILURES, "Storage errors surfaced as internal failures");
    describe_histogram!(
        ADMIT_DURATION_MS,
        "Duration of the capacity-checked admission transaction in milliseconds"
    );
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Record a counter metric with a single `reason` label
pub fn record_rejection(name: &'static str, reason: &'static str) {
    counter!(name, "reason" => reason).increment(1);
}

/// Record a histogram metric
pub fn record_histogram(name: &'static str, value: f64) {
    histogram!(name).record(value);
}

/// Wall-clock timer recorded into a histogram on [`Timer::stop`]
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        record_histogram(self.name, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}
