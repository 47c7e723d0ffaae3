//! Optional metrics side channel
//!
//! Transports report counter increments here. Nothing in the lifecycle depends
//! on a sink being present; [`NoopMetrics`] is the default everywhere.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Items found in the discovery location.
pub const INCOMING_ITEMS: &str = "IncomingItems";
/// Items moved to the completed location.
pub const FILE_COMPLETE: &str = "FileComplete";
/// Recoverable failures, including the one that exhausts the retry budget.
pub const FILE_FAILURE: &str = "FileFailure";
/// Items moved to the terminated location.
pub const FILE_TERMINAL: &str = "FileTerminal";

pub trait MetricsSink: Send + Sync {
    fn incr(&self, counter: &str, by: u64);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _counter: &str, _by: u64) {}
}

/// In-memory counters, mostly useful for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: &str) -> u64 {
        self.lock().get(counter).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, u64>> {
        // A poisoned map still holds valid counts.
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricsSink for CounterMetrics {
    fn incr(&self, counter: &str, by: u64) {
        *self.lock().entry(counter.to_string()).or_insert(0) += by;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn test_counter_metrics_accumulate() {
        let metrics = CounterMetrics::new();
        metrics.incr(INCOMING_ITEMS, 3);
        metrics.incr(FILE_COMPLETE, 1);
        metrics.incr(FILE_COMPLETE, 1);

        assert_eq!(metrics.get(FILE_COMPLETE), 2);
        assert_eq!(metrics.get(FILE_TERMINAL), 0);
        assert_eq!(
            metrics.snapshot(),
            btreemap! {
                INCOMING_ITEMS.to_string() => 3,
                FILE_COMPLETE.to_string() => 2,
            }
        );
    }

    #[test]
    fn test_noop_metrics_accepts_anything() {
        let sink: &dyn MetricsSink = &NoopMetrics;
        sink.incr("anything", 42);
    }
}
