//! Per-execution metrics.

use metrics::{histogram, increment_counter};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use uasc_core::{ExecutionResult, ExecutionStatus};

use crate::MonitoringConfig;

/// Counter of executions, labelled by status
pub const EXECUTIONS_TOTAL: &str = "uasc_executions_total";
/// Histogram of execution wall time in milliseconds, labelled by status
pub const EXECUTION_TIME_MS: &str = "uasc_execution_time_ms";
/// Histogram of visited nodes per execution
pub const NODES_VISITED: &str = "uasc_nodes_visited";

/// Running totals since start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Successful executions
    pub success: u64,
    /// Failed executions
    pub failed: u64,
    /// Rejected executions
    pub rejected: u64,
    /// Sum of execution times
    pub total_time_ms: u64,
}

impl MetricsSnapshot {
    /// All recorded executions
    pub fn total(&self) -> u64 {
        self.success + self.failed + self.rejected
    }
}

/// Records interpreter results.
///
/// Running totals are always kept; the `metrics` counters and histograms are
/// only emitted when export is enabled.
#[derive(Debug)]
pub struct ExecutionMetrics {
    export: bool,
    success: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    total_time_ms: AtomicU64,
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::with_export(true)
    }
}

impl ExecutionMetrics {
    /// Create zeroed metrics that export to the installed recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create zeroed metrics, exporting only if `export` is set
    pub fn with_export(export: bool) -> Self {
        Self {
            export,
            success: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            total_time_ms: AtomicU64::new(0),
        }
    }

    /// Metrics honouring [`MonitoringConfig::enable_metrics`]
    pub fn from_config(config: &MonitoringConfig) -> Self {
        Self::with_export(config.enable_metrics)
    }

    /// Whether results are emitted through the `metrics` macros
    pub fn exports(&self) -> bool {
        self.export
    }

    /// Record one execution of `glyph_code`
    pub fn record(&self, glyph_code: &str, result: &ExecutionResult) {
        let status = result.status.as_str();

        if self.export {
            increment_counter!(EXECUTIONS_TOTAL, "status" => status);
            histogram!(EXECUTION_TIME_MS, result.execution_time_ms as f64, "status" => status);
            histogram!(NODES_VISITED, result.node_trace.len() as f64);
        }

        let counter = match result.status {
            ExecutionStatus::Success => &self.success,
            ExecutionStatus::Failed => &self.failed,
            ExecutionStatus::Rejected => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total_time_ms
            .fetch_add(result.execution_time_ms, Ordering::Relaxed);

        info!(
            glyph_code = %glyph_code,
            status = %status,
            execution_time_ms = result.execution_time_ms,
            nodes = result.node_trace.len(),
            "Execution recorded"
        );
    }

    /// Current totals
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            total_time_ms: self.total_time_ms.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uasc_core::ParamMap;

    fn result(status: ExecutionStatus, execution_time_ms: u64) -> ExecutionResult {
        ExecutionResult {
            status,
            outputs: ParamMap::new(),
            execution_time_ms,
            node_trace: vec!["start".to_string()],
            error: None,
        }
    }

    #[test]
    fn test_record_counts_by_status() {
        let metrics = ExecutionMetrics::new();
        metrics.record("0x8003", &result(ExecutionStatus::Success, 4));
        metrics.record("0x8003", &result(ExecutionStatus::Success, 6));
        metrics.record("0x8004", &result(ExecutionStatus::Rejected, 0));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.success, 2);
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.total_time_ms, 10);
        assert_eq!(snapshot.total(), 3);
    }

    #[test]
    fn test_export_follows_config() {
        assert!(ExecutionMetrics::new().exports());

        let config = MonitoringConfig {
            enable_metrics: false,
            ..MonitoringConfig::default()
        };
        let metrics = ExecutionMetrics::from_config(&config);
        assert!(!metrics.exports());

        metrics.record("0x8003", &result(ExecutionStatus::Failed, 3));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.total_time_ms, 3);
    }
}
