//! Orchestrator integration tests.
//!
//! Tests the full flow: config -> batcher/forwarder wiring -> checks ->
//! health -> ordered shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use topoagent_batcher::TopologySubmitter;
use topoagent_collectors::{CheckTopologyCollector, CollectorError, TopologyCheck};
use topoagent_core::config::AgentConfig;
use topoagent_core::topology::{CheckId, Component, Instance};
use topoagent_daemon::orchestrator::Orchestrator;

const WAIT: Duration = Duration::from_secs(5);

/// Minimal config: batcher on, docker and metrics off, no PID file.
fn minimal_test_config() -> AgentConfig {
    let toml_str = r#"
[general]
log_level = "info"
hostname = "test-node"
pid_file = ""

[batcher]
enabled = true
max_capacity = 10

[docker]
enabled = false

[metrics]
enabled = false
"#;
    AgentConfig::parse(toml_str).expect("failed to parse minimal config")
}

/// Check that submits a fixed number of components and completes.
struct FixedCheck {
    collector: CheckTopologyCollector,
    components: usize,
    runs: AtomicUsize,
}

impl FixedCheck {
    fn new(components: usize) -> Self {
        Self {
            collector: CheckTopologyCollector::new("fixed_topology", Instance::new("test", "local")),
            components,
            runs: AtomicUsize::new(0),
        }
    }
}

impl TopologyCheck for FixedCheck {
    fn name(&self) -> &str {
        "fixed_topology"
    }

    async fn run(&self, submitter: &dyn TopologySubmitter) -> Result<(), CollectorError> {
        for i in 0..self.components {
            self.collector
                .submit_component(submitter, Component::new(format!("c-{i}"), "test"));
        }
        self.collector.submit_complete(submitter);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn wait_for_runs(check: &FixedCheck, runs: usize) {
    tokio::time::timeout(WAIT, async {
        while check.runs.load(Ordering::SeqCst) < runs {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("check did not run in time");
}

#[tokio::test]
async fn test_build_minimal_config_is_healthy() {
    // Given: A minimal config
    let config = minimal_test_config();

    // When: Building the orchestrator
    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("should build");

    // Then: Batcher and forwarder are reported healthy, no checks scheduled
    let health = orchestrator.health();
    assert!(health.status.is_healthy(), "status: {}", health.status);
    let names: Vec<&str> = health.components.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["batcher", "forwarder"]);
    assert!(orchestrator.check_names().is_empty());
    assert_eq!(orchestrator.identity().hostname, "test-node");

    let stats = orchestrator.shutdown().await.expect("shutdown should succeed");
    assert_eq!(stats.map(|s| s.payloads), Some(0));
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    // Given: A config with zero batcher capacity
    let mut config = minimal_test_config();
    config.batcher.max_capacity = 0;

    // When: Building the orchestrator
    let result = Orchestrator::build_from_config(config).await;

    // Then: Validation fails before anything is spawned
    let err = result.err().expect("zero capacity should be rejected");
    assert!(
        err.to_string().contains("config validation failed"),
        "unexpected error: {}",
        err
    );
}

#[tokio::test]
async fn test_submissions_reach_forwarder_before_shutdown_completes() {
    // Given: A running orchestrator
    let mut orchestrator = Orchestrator::build_from_config(minimal_test_config())
        .await
        .expect("should build");
    let submitter = orchestrator.submitter();

    // When: Submitting below capacity without completing, then shutting down
    for i in 0..3 {
        submitter.submit_component(
            CheckId::from("manual"),
            Instance::new("test", "local"),
            Component::new(format!("c-{i}"), "test"),
        );
    }
    let stats = orchestrator
        .shutdown()
        .await
        .expect("shutdown should succeed")
        .expect("forwarder should be running");

    // Then: The final flush produced exactly one payload
    assert_eq!(stats.payloads, 1);
    assert!(stats.bytes > 0);
}

#[tokio::test]
async fn test_spawned_check_flows_through_pipeline() {
    // Given: An orchestrator with a custom check
    let mut orchestrator = Orchestrator::build_from_config(minimal_test_config())
        .await
        .expect("should build");
    let check = Arc::new(FixedCheck::new(4));
    orchestrator.spawn_check(Arc::clone(&check), Duration::from_secs(3600));
    assert_eq!(orchestrator.check_names(), vec!["fixed_topology"]);

    // When: The first run completes and the daemon shuts down
    wait_for_runs(&check, 1).await;
    assert!(orchestrator.health().status.is_healthy());
    let stats = orchestrator
        .shutdown()
        .await
        .expect("shutdown should succeed")
        .expect("forwarder should be running");

    // Then: Complete flushed one payload, the empty final flush added none
    assert_eq!(check.runs.load(Ordering::SeqCst), 1);
    assert_eq!(stats.payloads, 1);
}

#[tokio::test]
async fn test_capacity_flushes_are_forwarded() {
    // Given: Capacity 10 and a check submitting 25 components per run
    let mut orchestrator = Orchestrator::build_from_config(minimal_test_config())
        .await
        .expect("should build");
    let check = Arc::new(FixedCheck::new(25));
    orchestrator.spawn_check(Arc::clone(&check), Duration::from_secs(3600));

    // When: One run completes
    wait_for_runs(&check, 1).await;
    let stats = orchestrator
        .shutdown()
        .await
        .expect("shutdown should succeed")
        .expect("forwarder should be running");

    // Then: Two capacity flushes (10 + 10) plus the complete flush (5)
    assert_eq!(stats.payloads, 3);
}

#[tokio::test]
async fn test_batcher_disabled_uses_noop_submitter() {
    // Given: Batcher disabled
    let mut config = minimal_test_config();
    config.batcher.enabled = false;

    // When: Building and submitting
    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("should build");
    orchestrator.submitter().submit_complete(CheckId::from("ignored"));

    // Then: Health ignores the disabled batcher, shutdown has no forwarder
    let health = orchestrator.health();
    assert!(health.status.is_healthy(), "status: {}", health.status);
    assert!(health.components.iter().all(|c| !c.enabled));
    let stats = orchestrator.shutdown().await.expect("shutdown should succeed");
    assert!(stats.is_none());
}

#[tokio::test]
async fn test_docker_check_scheduled_when_enabled() {
    // Given: Docker enabled on a path that is not a listening socket
    let temp_dir = TempDir::new().expect("should create temp dir");
    let socket = temp_dir.path().join("docker.sock");
    std::fs::write(&socket, b"").expect("should create placeholder");
    let mut config = minimal_test_config();
    config.docker.enabled = true;
    config.docker.docker_socket = socket.display().to_string();

    // When: Building the orchestrator
    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("docker client connects lazily");

    // Then: The docker check is scheduled and survives failed runs
    assert_eq!(orchestrator.check_names(), vec!["docker_topology"]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.health().status.is_healthy());

    orchestrator.shutdown().await.expect("shutdown should succeed");
}

#[tokio::test]
async fn test_shutdown_twice_is_safe() {
    // Given: An orchestrator that has already been shut down
    let mut orchestrator = Orchestrator::build_from_config(minimal_test_config())
        .await
        .expect("should build");
    orchestrator.shutdown().await.expect("first shutdown");

    // When: Shutting down again
    let second = orchestrator.shutdown().await.expect("second shutdown");

    // Then: Nothing left to drain
    assert!(second.is_none());
}

#[tokio::test]
async fn test_run_until_manages_pid_file() {
    // Given: A config pointing the PID file into a temp directory
    let temp_dir = TempDir::new().expect("should create temp dir");
    let pid_path = temp_dir.path().join("topoagent.pid");
    let mut config = minimal_test_config();
    config.general.pid_file = pid_path.display().to_string();
    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("should build");

    // When: Running until an immediate shutdown trigger
    let observed = pid_path.clone();
    let result = orchestrator
        .run_until(async move {
            assert!(observed.exists(), "PID file should exist while running");
            Ok("test")
        })
        .await;

    // Then: Run succeeds and the PID file is removed
    assert!(result.is_ok(), "run_until failed: {:?}", result.err());
    assert!(!pid_path.exists(), "PID file should be removed on shutdown");
}

#[tokio::test]
async fn test_run_until_fails_when_pid_file_exists() {
    // Given: A PID file left by another instance
    let temp_dir = TempDir::new().expect("should create temp dir");
    let pid_path = temp_dir.path().join("topoagent.pid");
    std::fs::write(&pid_path, "4242\n").expect("should write PID file");
    let mut config = minimal_test_config();
    config.general.pid_file = pid_path.display().to_string();
    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("should build");

    // When: Running
    let result = orchestrator.run_until(async { Ok("unreachable") }).await;

    // Then: Startup fails and the foreign PID file is left alone
    let err = result.expect_err("duplicate instance should be rejected");
    assert!(err.to_string().contains("4242"));
    assert_eq!(
        std::fs::read_to_string(&pid_path).expect("read"),
        "4242\n"
    );
}
