//! Metric names and descriptions for the store runtime.
//!
//! The runtime records through the `metrics` facade only. Installing a
//! recorder (Prometheus, statsd, an in-app debug overlay) is left to the host
//! application; without one every call is a no-op.
//!
//! # Example
//!
//! ```
//! use storefront_runtime::metrics::describe_metrics;
//!
//! // Once at startup, after the host installed its recorder
//! describe_metrics();
//! ```

use metrics::{describe_counter, describe_histogram};
use std::time::Duration;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Actions accepted by `Store::send`
pub const COMMANDS_TOTAL: &str = "store.commands.total";
/// Effects started, labelled by `type`
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";
/// Effects produced per action
pub const EFFECTS_COUNT: &str = "store.effects.count";
/// Time spent inside the reducer
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";
/// Actions rejected because the store is shutting down
pub const SHUTDOWN_REJECTED: &str = "store.shutdown.rejected_actions";
/// Shutdowns started
pub const SHUTDOWN_INITIATED: &str = "store.shutdown.initiated";
/// Shutdowns that drained every effect in time
pub const SHUTDOWN_COMPLETED: &str = "store.shutdown.completed";
/// Shutdowns that gave up with effects still running
pub const SHUTDOWN_TIMEOUT: &str = "store.shutdown.timeout";

/// Register descriptions for every metric the runtime emits.
pub fn describe_metrics() {
    describe_counter!(COMMANDS_TOTAL, "Total number of actions sent to stores");
    describe_counter!(EFFECTS_EXECUTED, "Total number of effects executed, by type");
    describe_histogram!(EFFECTS_COUNT, "Number of effects returned per reduced action");
    describe_histogram!(REDUCER_DURATION, "Time taken to execute reducers");
    describe_counter!(SHUTDOWN_REJECTED, "Actions rejected during shutdown");
    describe_counter!(SHUTDOWN_INITIATED, "Graceful shutdowns initiated");
    describe_counter!(SHUTDOWN_COMPLETED, "Graceful shutdowns that drained all effects");
    describe_counter!(SHUTDOWN_TIMEOUT, "Graceful shutdowns that timed out");
}

/// Reducer metrics recorder.
pub struct ReducerMetrics;

impl ReducerMetrics {
    /// Record one reducer pass and the number of effects it returned.
    #[allow(clippy::cast_precision_loss)] // effect counts are tiny
    pub fn record(duration: Duration, effects: usize) {
        histogram!(REDUCER_DURATION).record(duration.as_secs_f64());
        histogram!(EFFECTS_COUNT).record(effects as f64);
    }
}
