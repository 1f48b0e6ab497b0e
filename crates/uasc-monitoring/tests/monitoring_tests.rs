use pretty_assertions::assert_eq;
use std::sync::Arc;
use uasc_core::{ExecutionResult, ExecutionStatus, ParamMap};
use uasc_monitoring::{ExecutionMetrics, MetricsSnapshot};

fn failed(execution_time_ms: u64) -> ExecutionResult {
    ExecutionResult {
        status: ExecutionStatus::Failed,
        outputs: ParamMap::new(),
        execution_time_ms,
        node_trace: vec!["start".to_string(), "clear_corridor".to_string()],
        error: Some("Action 'traffic.emergency_corridor' failed: zone offline".to_string()),
    }
}

#[tokio::test]
async fn test_concurrent_recording() {
    let metrics = Arc::new(ExecutionMetrics::new());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let metrics = metrics.clone();
            tokio::spawn(async move {
                for _ in 0..10 {
                    metrics.record("0x8003", &failed(2));
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(
        metrics.snapshot(),
        MetricsSnapshot {
            success: 0,
            failed: 80,
            rejected: 0,
            total_time_ms: 160,
        }
    );
}

#[test]
fn test_snapshot_serializes() {
    let metrics = ExecutionMetrics::new();
    metrics.record("0x8003", &failed(7));

    let json = serde_json::to_value(metrics.snapshot()).unwrap();
    assert_eq!(json["failed"], 1);
    assert_eq!(json["total_time_ms"], 7);
}
