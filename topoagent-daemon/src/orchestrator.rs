//! Daemon orchestration -- assembly, queue wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `topoagent-daemon`.
//! It loads configuration, creates the transport queue, spawns the batcher
//! and the enabled topology checks, and shuts them down in order.
//!
//! # Data Flow
//!
//! ```text
//! checks ──submit──> AsyncBatcher ──TopologyBatch──> JsonSerializer
//!                                                        │ try_send
//!                                                        ▼
//!                                        transport queue ──> forwarder
//! ```
//!
//! # Shutdown Order (producers first)
//!
//! 1. Topology checks (cancel, await in-flight runs)
//! 2. Batcher (apply queued submissions, final flush)
//! 3. Forwarder (drains the queue once the serializer is dropped)

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use topoagent_batcher::{
    AgentIdentity, AsyncBatcher, BatcherConfig, JsonSerializer, TopologySubmitter, submitter_for,
};
use topoagent_collectors::{BollardDockerClient, DockerTopologyCollector, TopologyCheck, spawn_periodic};
use topoagent_core::config::AgentConfig;
use topoagent_core::metrics as m;

use crate::forwarder::{ForwarderStats, spawn_forwarder};
use crate::health::{ComponentHealth, DaemonHealth, aggregate_status, task_status};
use crate::metrics_server;
use crate::pid_file::{remove_pid_file, write_pid_file};

/// Interval between uptime gauge updates.
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// A spawned periodic topology check.
struct RunningCheck {
    name: String,
    task: JoinHandle<()>,
}

/// The main daemon orchestrator.
///
/// Manages the complete lifecycle of the daemon: configuration loading,
/// queue wiring, check scheduling, health reporting, and graceful shutdown.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: AgentConfig,
    /// Identity stamped on every intake message.
    identity: AgentIdentity,
    /// Batcher actor (None when disabled or already shut down).
    batcher: Option<AsyncBatcher>,
    /// Submitter bound to the batcher (noop when disabled).
    submitter: Arc<dyn TopologySubmitter>,
    /// Transport queue consumer.
    forwarder: Option<JoinHandle<ForwarderStats>>,
    /// Periodic check tasks.
    checks: Vec<RunningCheck>,
    /// Cancels checks and the uptime updater.
    cancel: CancellationToken,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The batcher or an enabled check fails to initialize
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = AgentConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build_from_config(config: AgentConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let identity = AgentIdentity::from_config(&config.general);
        let cancel = CancellationToken::new();

        let (batcher, forwarder) = if config.batcher.enabled {
            tracing::debug!(
                queue_capacity = config.forwarder.queue_capacity,
                "creating transport queue"
            );
            let (serializer, queue) = JsonSerializer::channel(config.forwarder.queue_capacity);
            let forwarder = spawn_forwarder(queue);

            let batcher = AsyncBatcher::spawn(
                BatcherConfig::from_core(&config.batcher),
                Arc::new(serializer),
                identity.clone(),
            )
            .map_err(|e| anyhow::anyhow!("failed to start batcher: {}", e))?;
            (Some(batcher), Some(forwarder))
        } else {
            tracing::warn!("batcher disabled, topology submissions will be discarded");
            (None, None)
        };

        let submitter = submitter_for(batcher.as_ref());

        let mut checks = Vec::new();
        if config.docker.enabled {
            tracing::info!(socket = %config.docker.docker_socket, "initializing docker topology check");
            let docker = BollardDockerClient::connect_with_socket(&config.docker.docker_socket)
                .map_err(|e| anyhow::anyhow!("failed to build docker client: {}", e))?;
            let check = Arc::new(DockerTopologyCollector::new(Arc::new(docker)));
            checks.push(schedule(
                check,
                Arc::clone(&submitter),
                Duration::from_secs(config.docker.collection_interval_secs),
                cancel.child_token(),
            ));
        }

        tracing::info!(
            hostname = %identity.hostname,
            batcher = batcher.is_some(),
            checks = checks.len(),
            "orchestrator initialized"
        );

        if config.metrics.enabled {
            record_daemon_metrics(checks.len());
        }

        Ok(Self {
            config,
            identity,
            batcher,
            submitter,
            forwarder,
            checks,
            cancel,
            start_time: Instant::now(),
        })
    }

    /// Run until SIGTERM or SIGINT, then shut down gracefully.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then shut down gracefully.
    ///
    /// `shutdown` yields the name of the trigger for logging.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let pid_file = self.pid_file_path();
        if let Some(path) = &pid_file {
            if let Err(e) = write_pid_file(path) {
                // Tear down what build_from_config already started.
                self.shutdown().await?;
                return Err(e);
            }
        }

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.cancel.child_token()));

        tracing::info!(status = %self.health().status, "daemon running");

        let signal = shutdown.await;
        match &signal {
            Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "shutdown signal handling failed"),
        }

        let result = self.shutdown().await;

        if let Some(task) = uptime_task {
            let _ = task.await;
        }
        if let Some(path) = &pid_file {
            remove_pid_file(path);
        }

        signal.and(result).map(|_| ())
    }

    /// Perform graceful shutdown.
    ///
    /// Stops checks first, then the batcher (final flush), then waits for
    /// the forwarder to drain the transport queue. Safe to call twice.
    ///
    /// Returns the forwarder totals, or `None` if no forwarder was running.
    pub async fn shutdown(&mut self) -> Result<Option<ForwarderStats>> {
        tracing::info!(checks = self.checks.len(), "stopping topology checks");
        self.cancel.cancel();
        for check in self.checks.drain(..) {
            if let Err(e) = check.task.await {
                tracing::error!(check = %check.name, error = %e, "check task terminated abnormally");
            }
        }
        if self.config.metrics.enabled {
            metrics::gauge!(m::DAEMON_CHECKS_RUNNING).set(0.0);
        }

        // The transport queue closes only once the actor drops its serializer.
        let batcher_result = match self.batcher.take() {
            Some(batcher) => batcher
                .shutdown()
                .await
                .map_err(|e| anyhow::anyhow!("batcher shutdown failed: {}", e)),
            None => Ok(()),
        };

        let mut stats = None;
        if let Some(forwarder) = self.forwarder.take() {
            match forwarder.await {
                Ok(drained) => {
                    tracing::info!(
                        payloads = drained.payloads,
                        bytes = drained.bytes,
                        "forwarder drained"
                    );
                    stats = Some(drained);
                }
                Err(e) => tracing::error!(error = %e, "forwarder task terminated abnormally"),
            }
        }

        batcher_result.map(|()| stats)
    }

    /// Get the current aggregated health status.
    pub fn health(&self) -> DaemonHealth {
        let batcher_enabled = self.config.batcher.enabled;
        let mut components = vec![
            ComponentHealth::new(
                "batcher",
                batcher_enabled,
                self.batcher
                    .as_ref()
                    .map(AsyncBatcher::health)
                    .unwrap_or_else(|| task_status(batcher_enabled, "batcher")),
            ),
            ComponentHealth::new(
                "forwarder",
                batcher_enabled,
                self.forwarder
                    .as_ref()
                    .map(|task| task_status(task.is_finished(), "forwarder"))
                    .unwrap_or_else(|| task_status(batcher_enabled, "forwarder")),
            ),
        ];
        components.extend(self.checks.iter().map(|check| {
            ComponentHealth::new(
                format!("check:{}", check.name),
                true,
                task_status(check.task.is_finished(), "check task"),
            )
        }));

        let uptime_secs = self.start_time.elapsed().as_secs();
        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs,
            components,
        }
    }

    /// Submitter bound to this daemon's batcher.
    pub fn submitter(&self) -> Arc<dyn TopologySubmitter> {
        Arc::clone(&self.submitter)
    }

    /// Schedule an additional topology check on the shared submitter.
    ///
    /// The check is stopped together with the built-in checks on shutdown.
    pub fn spawn_check<C: TopologyCheck>(&mut self, check: Arc<C>, interval: Duration) {
        self.checks.push(schedule(
            check,
            Arc::clone(&self.submitter),
            interval,
            self.cancel.child_token(),
        ));
        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_CHECKS_RUNNING).set(self.checks.len() as f64);
        }
    }

    /// Names of the scheduled checks.
    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name.as_str()).collect()
    }

    /// Identity stamped on intake messages.
    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn pid_file_path(&self) -> Option<PathBuf> {
        let path = &self.config.general.pid_file;
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

fn schedule<C: TopologyCheck>(
    check: Arc<C>,
    submitter: Arc<dyn TopologySubmitter>,
    interval: Duration,
    cancel: CancellationToken,
) -> RunningCheck {
    let name = check.name().to_owned();
    let task = spawn_periodic(check, submitter, interval, cancel);
    RunningCheck { name, task }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Record daemon-level metrics (build info, checks running).
fn record_daemon_metrics(check_count: usize) {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_CHECKS_RUNNING).set(check_count as f64);

    tracing::debug!(
        check_count = check_count,
        version = env!("CARGO_PKG_VERSION"),
        "daemon metrics recorded"
    );
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(start_time: Instant, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_uptime_updater_stops_on_cancel() {
        // Given: A running uptime updater
        let cancel = CancellationToken::new();
        let task = spawn_uptime_updater(Instant::now(), cancel.clone());

        // When: Cancelling after a few ticks
        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();

        // Then: Task should complete quickly
        let result = tokio::time::timeout(Duration::from_millis(100), task).await;
        assert!(result.is_ok(), "uptime updater should shut down within timeout");
    }

    #[tokio::test]
    async fn test_schedule_keeps_check_name() {
        struct Named;
        impl TopologyCheck for Named {
            fn name(&self) -> &str {
                "named_topology"
            }
            async fn run(
                &self,
                _submitter: &dyn TopologySubmitter,
            ) -> Result<(), topoagent_collectors::CollectorError> {
                Ok(())
            }
        }

        // Given: A check scheduled on a noop submitter
        let cancel = CancellationToken::new();
        let running = schedule(
            Arc::new(Named),
            submitter_for(None),
            Duration::from_secs(60),
            cancel.clone(),
        );

        // Then: The running entry carries the check name and stops on cancel
        assert_eq!(running.name, "named_topology");
        cancel.cancel();
        running.task.await.expect("check task panicked");
    }
}
