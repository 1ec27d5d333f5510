//! Invalidation metrics
//!
//! Counters are emitted through the `metrics` facade by the executor; the
//! host application installs whichever recorder/exporter it uses.

use metrics::{describe_counter, gauge, Unit};

use crate::domain::invalidation::{
    DETACHED_FAILURES_TOTAL, FAILURES_TOTAL, RUNS_TOTAL, UNMATCHED_TOTAL,
};

/// Registers descriptions for every counter the executor emits
pub fn describe_metrics() {
    describe_counter!(
        RUNS_TOTAL,
        Unit::Count,
        "Executor runs for mutations with a registered rule, by strategy"
    );
    describe_counter!(
        UNMATCHED_TOTAL,
        Unit::Count,
        "Settled mutations without a registered rule"
    );
    describe_counter!(
        FAILURES_TOTAL,
        Unit::Count,
        "Awaited invalidation steps that failed and were returned to the caller"
    );
    describe_counter!(
        DETACHED_FAILURES_TOTAL,
        Unit::Count,
        "Background invalidation steps that failed and were only logged"
    );

    gauge!("mutation_invalidation_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}
