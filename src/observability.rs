use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Engine call counters for the lifetime of the process
#[derive(Debug, Default)]
pub struct SupervisorMetrics {
    pub synchronize_calls: AtomicU64,
    pub synchronize_failures: AtomicU64,
    pub boot_calls: AtomicU64,
    pub boot_failures: AtomicU64,
    pub retries: AtomicU64,
}

impl SupervisorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_synchronize(&self, ok: bool) {
        self.synchronize_calls.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.synchronize_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_boot(&self, ok: bool) {
        self.boot_calls.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.boot_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SupervisorStats {
        SupervisorStats {
            synchronize_calls: self.synchronize_calls.load(Ordering::Relaxed),
            synchronize_failures: self.synchronize_failures.load(Ordering::Relaxed),
            boot_calls: self.boot_calls.load(Ordering::Relaxed),
            boot_failures: self.boot_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            synchronize_calls = stats.synchronize_calls,
            synchronize_failures = stats.synchronize_failures,
            boot_calls = stats.boot_calls,
            boot_failures = stats.boot_failures,
            retries = stats.retries,
            "Engine call metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStats {
    pub synchronize_calls: u64,
    pub synchronize_failures: u64,
    pub boot_calls: u64,
    pub boot_failures: u64,
    pub retries: u64,
}

/// Global metrics instance
static SUPERVISOR_METRICS: std::sync::LazyLock<SupervisorMetrics> =
    std::sync::LazyLock::new(SupervisorMetrics::new);

pub fn supervisor_metrics() -> &'static SupervisorMetrics {
    &SUPERVISOR_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        debug!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_count_as_calls() {
        let metrics = SupervisorMetrics::new();
        metrics.record_synchronize(true);
        metrics.record_synchronize(false);
        metrics.record_boot(true);
        metrics.record_retry();

        assert_eq!(
            metrics.get_stats(),
            SupervisorStats {
                synchronize_calls: 2,
                synchronize_failures: 1,
                boot_calls: 1,
                boot_failures: 0,
                retries: 1,
            }
        );
    }
}
