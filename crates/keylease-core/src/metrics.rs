// Metrics for lease activity
// Counters are described here once; recording helpers are called from the
// lease manager's hot paths.

use metrics::{counter, describe_counter};

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    describe_counter!(
        "lease_acquire_total",
        "Total number of lease grants, renewals included"
    );
    describe_counter!(
        "lease_acquire_contended_total",
        "Total number of acquisition attempts lost to a live lease"
    );
    describe_counter!("lease_release_total", "Total number of lease releases");
    describe_counter!(
        "lease_wait_timeout_total",
        "Total number of waiting acquisitions that ran out their deadline"
    );
}

pub fn record_acquired() {
    counter!("lease_acquire_total").increment(1);
}

pub fn record_contended() {
    counter!("lease_acquire_contended_total").increment(1);
}

pub fn record_released() {
    counter!("lease_release_total").increment(1);
}

pub fn record_wait_timeout() {
    counter!("lease_wait_timeout_total").increment(1);
}
