//! 체크 스캐폴딩 -- 체크 ID/인스턴스 쌍과 주기 실행 루프
//!
//! 모든 토폴로지 체크는 [`CheckTopologyCollector`]를 하나씩 가지고,
//! 주입받은 [`TopologySubmitter`]로 결과를 제출합니다.
//!
//! # 주기 실행
//! ```text
//! spawn_periodic(check) ──tick──> check.run(submitter) ──> submit_* ──> batcher
//!        │                              │
//!   cancel token                 error: log + count, 다음 tick 계속
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use topoagent_batcher::TopologySubmitter;
use topoagent_core::metrics as m;
use topoagent_core::topology::{CheckId, Component, Instance, Relation};

use crate::error::CollectorError;

/// 체크가 제출할 때 사용하는 체크 ID와 인스턴스
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTopologyCollector {
    /// 체크 ID
    pub check_id: CheckId,
    /// 토폴로지 인스턴스
    pub instance: Instance,
}

impl CheckTopologyCollector {
    /// 새 수집기 식별 쌍을 생성합니다.
    pub fn new(check_id: impl Into<CheckId>, instance: Instance) -> Self {
        Self {
            check_id: check_id.into(),
            instance,
        }
    }

    /// 스냅샷 시작을 제출합니다.
    pub fn submit_start_snapshot(&self, submitter: &dyn TopologySubmitter) {
        submitter.submit_start_snapshot(self.check_id.clone(), self.instance.clone());
    }

    /// 스냅샷 종료를 제출합니다 (배치 플러시).
    pub fn submit_stop_snapshot(&self, submitter: &dyn TopologySubmitter) {
        submitter.submit_stop_snapshot(self.check_id.clone(), self.instance.clone());
    }

    /// 컴포넌트 하나를 제출합니다.
    pub fn submit_component(&self, submitter: &dyn TopologySubmitter, component: Component) {
        submitter.submit_component(self.check_id.clone(), self.instance.clone(), component);
    }

    /// 릴레이션 하나를 제출합니다.
    pub fn submit_relation(&self, submitter: &dyn TopologySubmitter, relation: Relation) {
        submitter.submit_relation(self.check_id.clone(), self.instance.clone(), relation);
    }

    /// 이번 실행의 완료를 알립니다.
    pub fn submit_complete(&self, submitter: &dyn TopologySubmitter) {
        submitter.submit_complete(self.check_id.clone());
    }
}

/// 주기적으로 실행되는 토폴로지 체크
pub trait TopologyCheck: Send + Sync + 'static {
    /// 로그/메트릭 레이블에 쓰이는 체크 이름
    fn name(&self) -> &str;

    /// 체크를 한 번 실행하여 토폴로지를 제출합니다.
    fn run(
        &self,
        submitter: &dyn TopologySubmitter,
    ) -> impl Future<Output = Result<(), CollectorError>> + Send;
}

/// 체크를 `interval` 주기로 실행하는 태스크를 spawn 합니다.
///
/// 첫 실행은 즉시 이루어지며, 실행 에러는 로깅/카운트 후 다음 주기를 계속합니다.
/// `cancel`이 취소되면 진행 중인 실행이 끝난 뒤 루프를 종료합니다.
pub fn spawn_periodic<C: TopologyCheck>(
    check: Arc<C>,
    submitter: Arc<dyn TopologySubmitter>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = check.name().to_owned();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(check = %name, interval_secs = interval.as_secs(), "topology check scheduled");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(check = %name, "topology check cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    run_once(check.as_ref(), submitter.as_ref(), &name).await;
                }
            }
        }
    })
}

async fn run_once<C: TopologyCheck>(check: &C, submitter: &dyn TopologySubmitter, name: &str) {
    let started = Instant::now();
    let result = check.run(submitter).await;
    let elapsed = started.elapsed();

    metrics::histogram!(m::COLLECTOR_RUN_DURATION_SECONDS, m::LABEL_CHECK => name.to_owned())
        .record(elapsed.as_secs_f64());

    match result {
        Ok(()) => {
            debug!(check = %name, elapsed_ms = elapsed.as_millis() as u64, "topology check completed");
            metrics::counter!(
                m::COLLECTOR_RUNS_TOTAL,
                m::LABEL_CHECK => name.to_owned(),
                m::LABEL_RESULT => "success"
            )
            .increment(1);
        }
        Err(e) => {
            warn!(check = %name, error = %e, "topology check failed");
            metrics::counter!(
                m::COLLECTOR_RUNS_TOTAL,
                m::LABEL_CHECK => name.to_owned(),
                m::LABEL_RESULT => "failure"
            )
            .increment(1);
            metrics::counter!(m::COLLECTOR_ERRORS_TOTAL, m::LABEL_CHECK => name.to_owned())
                .increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use topoagent_batcher::MockBatcher;

    /// 실행 횟수를 세고, 설정에 따라 실패하는 테스트용 체크
    struct CountingCheck {
        collector: CheckTopologyCollector,
        runs: AtomicUsize,
        fail: bool,
    }

    impl CountingCheck {
        fn new(fail: bool) -> Self {
            Self {
                collector: CheckTopologyCollector::new(
                    "counting_topology",
                    Instance::new("test", "local"),
                ),
                runs: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl TopologyCheck for CountingCheck {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self, submitter: &dyn TopologySubmitter) -> Result<(), CollectorError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CollectorError::DockerApi("unreachable".to_owned()));
            }
            self.collector
                .submit_component(submitter, Component::new(format!("c-{run}"), "test"));
            self.collector.submit_complete(submitter);
            Ok(())
        }
    }

    #[test]
    fn collector_submits_with_its_identity() {
        let mock = MockBatcher::new();
        let collector = CheckTopologyCollector::new("docker_topology", Instance::new("docker", "agents"));

        collector.submit_start_snapshot(&mock);
        collector.submit_component(&mock, Component::new("c1", "container"));
        collector.submit_relation(&mock, Relation::between("c1", "host", "runs_on"));
        collector.submit_stop_snapshot(&mock);
        collector.submit_complete(&mock);

        let topology = mock.topology(&CheckId::from("docker_topology")).unwrap();
        assert_eq!(topology.instance, Instance::new("docker", "agents"));
        assert!(topology.start_snapshot);
        assert!(topology.stop_snapshot);
        assert_eq!(topology.components.len(), 1);
        assert_eq!(topology.relations.len(), 1);
        assert_eq!(mock.completed(), vec![CheckId::from("docker_topology")]);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_runs_until_cancelled() {
        let check = Arc::new(CountingCheck::new(false));
        let mock = Arc::new(MockBatcher::new());
        let cancel = CancellationToken::new();

        let task = spawn_periodic(
            Arc::clone(&check),
            mock.clone(),
            Duration::from_secs(10),
            cancel.clone(),
        );

        // 첫 tick 즉시 + 10초, 20초
        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(check.runs.load(Ordering::SeqCst), 3);
        assert_eq!(mock.element_count(), 3);
        assert_eq!(mock.completed().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_keeps_running_after_errors() {
        let check = Arc::new(CountingCheck::new(true));
        let mock = Arc::new(MockBatcher::new());
        let cancel = CancellationToken::new();

        let task = spawn_periodic(
            Arc::clone(&check),
            mock.clone(),
            Duration::from_secs(1),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(check.runs.load(Ordering::SeqCst), 3);
        assert_eq!(mock.element_count(), 0);
    }
}
