//! Health aggregation tests.
//!
//! Tests the health status aggregation logic and component health reporting.

use topoagent_core::pipeline::HealthStatus;
use topoagent_daemon::health::{ComponentHealth, DaemonHealth, aggregate_status, task_status};

#[test]
fn test_aggregate_status_all_healthy() {
    // Given: All components are healthy
    let components = vec![
        ComponentHealth::new("batcher", true, HealthStatus::Healthy),
        ComponentHealth::new("forwarder", true, HealthStatus::Healthy),
        ComponentHealth::new("check:docker_topology", true, HealthStatus::Healthy),
    ];

    // When: Aggregating status
    let status = aggregate_status(&components);

    // Then: Overall status should be Healthy
    assert!(
        status.is_healthy(),
        "all healthy components should result in healthy status"
    );
}

#[test]
fn test_aggregate_status_one_degraded() {
    // Given: One component is degraded
    let components = vec![
        ComponentHealth::new("batcher", true, HealthStatus::Healthy),
        ComponentHealth::new(
            "forwarder",
            true,
            HealthStatus::Degraded("transport queue nearly full".to_string()),
        ),
    ];

    // When: Aggregating status
    let status = aggregate_status(&components);

    // Then: Overall status should be Degraded with reason
    match &status {
        HealthStatus::Degraded(reason) => {
            assert!(
                reason.contains("forwarder"),
                "degraded reason should mention the component name"
            );
            assert!(
                reason.contains("transport queue nearly full"),
                "degraded reason should include the original reason"
            );
        }
        other => panic!("expected Degraded status, got: {:?}", other),
    }
}

#[test]
fn test_aggregate_status_unhealthy_wins_over_degraded() {
    // Given: One degraded and one unhealthy component
    let components = vec![
        ComponentHealth::new("forwarder", true, HealthStatus::Degraded("slow".to_string())),
        ComponentHealth::new(
            "batcher",
            true,
            HealthStatus::Unhealthy("batcher actor stopped".to_string()),
        ),
    ];

    // When: Aggregating status
    let status = aggregate_status(&components);

    // Then: Overall status should be Unhealthy and list the actor failure
    match &status {
        HealthStatus::Unhealthy(reason) => {
            assert!(reason.contains("batcher: batcher actor stopped"));
        }
        other => panic!("expected Unhealthy status, got: {:?}", other),
    }
}

#[test]
fn test_aggregate_status_ignores_disabled_components() {
    // Given: A disabled component reporting unhealthy
    let components = vec![
        ComponentHealth::new("batcher", false, HealthStatus::Unhealthy("off".to_string())),
        ComponentHealth::new("check:docker_topology", true, HealthStatus::Healthy),
    ];

    // When: Aggregating status
    let status = aggregate_status(&components);

    // Then: Disabled components do not affect the result
    assert!(status.is_healthy(), "disabled components should be ignored");
}

#[test]
fn test_aggregate_status_empty_is_healthy() {
    // Given: No components at all
    // When/Then: Aggregated status is Healthy
    assert!(aggregate_status(&[]).is_healthy());
}

#[test]
fn test_task_status_reports_exited_task() {
    // Given: A background task that has finished
    let status = task_status(true, "forwarder");

    // Then: Reported as unhealthy with the task name
    assert_eq!(
        status,
        HealthStatus::Unhealthy("forwarder exited unexpectedly".to_string())
    );
    assert!(task_status(false, "forwarder").is_healthy());
}

#[test]
fn test_daemon_health_serializes_to_json() {
    // Given: A health report
    let components = vec![ComponentHealth::new("batcher", true, HealthStatus::Healthy)];
    let health = DaemonHealth {
        status: aggregate_status(&components),
        uptime_secs: 42,
        components,
    };

    // When: Serializing to JSON
    let json = serde_json::to_value(&health).expect("should serialize");

    // Then: Fields are present
    assert_eq!(json["uptime_secs"], 42);
    assert_eq!(json["status"], "Healthy");
    assert_eq!(json["components"][0]["name"], "batcher");
    assert_eq!(json["components"][0]["enabled"], true);
}
