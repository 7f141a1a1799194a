//! 배처 액터 -- 동시 제출을 직렬화하여 하나의 버퍼에 적용하고 플러시 시점을 결정
//!
//! [`AsyncBatcher`]는 tokio 태스크 하나가 [`TopologyBuilder`]를 단독 소유하는
//! 액터입니다. 제출자는 [`BatcherHandle`]로 명령을 unbounded 채널에 넣기만 하므로
//! 다른 제출자나 직렬화기를 기다리지 않습니다.
//!
//! # 플러시 트리거
//! - [`FlushTrigger::Capacity`]: 컴포넌트/릴레이션 추가 후 카운트 >= 최대 용량
//! - [`FlushTrigger::StopSnapshot`]: 스냅샷 종료 제출
//! - [`FlushTrigger::Complete`]: 버퍼에 존재하는 체크의 완료 제출
//! - [`FlushTrigger::Shutdown`]: 종료 시 남은 스냅샷
//!
//! # 종료 순서
//! ```text
//! shutdown() -> Shutdown 명령 -> 수신측 close -> 대기 중 명령 적용
//!            -> 남은 버퍼 플러시 -> ack -> 태스크 종료
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use topoagent_core::metrics as m;
use topoagent_core::pipeline::HealthStatus;
use topoagent_core::topology::{CheckId, Component, Instance, Relation};

use crate::buffer::TopologyBuilder;
use crate::config::BatcherConfig;
use crate::error::BatcherError;
use crate::serializer::{AgentIdentity, Serializer, TopologyBatch};
use crate::submitter::TopologySubmitter;

/// 플러시 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// 최대 용량 도달
    Capacity,
    /// 스냅샷 종료 제출
    StopSnapshot,
    /// 체크 완료 제출
    Complete,
    /// 배처 종료
    Shutdown,
}

impl FlushTrigger {
    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capacity => "capacity",
            Self::StopSnapshot => "stop_snapshot",
            Self::Complete => "complete",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 버퍼에 적용되는 제출
#[derive(Debug)]
pub(crate) enum Submission {
    StartSnapshot {
        check_id: CheckId,
        instance: Instance,
    },
    StopSnapshot {
        check_id: CheckId,
        instance: Instance,
    },
    Component {
        check_id: CheckId,
        instance: Instance,
        component: Component,
    },
    Relation {
        check_id: CheckId,
        instance: Instance,
        relation: Relation,
    },
    Complete {
        check_id: CheckId,
    },
}

impl Submission {
    fn kind(&self) -> &'static str {
        match self {
            Self::StartSnapshot { .. } => "start_snapshot",
            Self::StopSnapshot { .. } => "stop_snapshot",
            Self::Component { .. } => "component",
            Self::Relation { .. } => "relation",
            Self::Complete { .. } => "complete",
        }
    }
}

/// 액터 명령
#[derive(Debug)]
pub(crate) enum BatcherCommand {
    Submit(Submission),
    Shutdown { ack: oneshot::Sender<()> },
}

/// 배처 액터로 명령을 보내는 핸들
///
/// 복제 비용이 작고, 모든 메서드가 동기 비블로킹입니다.
#[derive(Debug, Clone)]
pub struct BatcherHandle {
    tx: mpsc::UnboundedSender<BatcherCommand>,
}

impl BatcherHandle {
    /// 액터가 종료되어 더 이상 제출을 받지 않는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, submission: Submission) {
        let kind = submission.kind();
        match self.tx.send(BatcherCommand::Submit(submission)) {
            Ok(()) => {
                metrics::counter!(m::BATCHER_SUBMISSIONS_TOTAL, m::LABEL_KIND => kind).increment(1);
            }
            Err(_) => {
                debug!(kind, "batcher stopped, dropping submission");
                metrics::counter!(m::BATCHER_DROPPED_SUBMISSIONS_TOTAL).increment(1);
            }
        }
    }
}

impl TopologySubmitter for BatcherHandle {
    fn submit_start_snapshot(&self, check_id: CheckId, instance: Instance) {
        self.send(Submission::StartSnapshot { check_id, instance });
    }

    fn submit_stop_snapshot(&self, check_id: CheckId, instance: Instance) {
        self.send(Submission::StopSnapshot { check_id, instance });
    }

    fn submit_component(&self, check_id: CheckId, instance: Instance, component: Component) {
        self.send(Submission::Component {
            check_id,
            instance,
            component,
        });
    }

    fn submit_relation(&self, check_id: CheckId, instance: Instance, relation: Relation) {
        self.send(Submission::Relation {
            check_id,
            instance,
            relation,
        });
    }

    fn submit_complete(&self, check_id: CheckId) {
        self.send(Submission::Complete { check_id });
    }
}

/// 비동기 토폴로지 배처
///
/// # 사용 예시
/// ```ignore
/// let batcher = AsyncBatcher::spawn(config, serializer, identity)?;
/// let submitter = submitter_for(Some(&batcher));
/// submitter.submit_component(check_id, instance, component);
/// batcher.shutdown().await?;
/// ```
pub struct AsyncBatcher {
    handle: BatcherHandle,
    task: JoinHandle<()>,
}

impl AsyncBatcher {
    /// 배처 액터를 현재 tokio 런타임에 spawn 합니다.
    ///
    /// 용량이 0이면 즉시 실패하며, 런타임 컨텍스트 밖에서 호출하면
    /// [`BatcherError::Runtime`]을 반환합니다.
    pub fn spawn(
        config: BatcherConfig,
        serializer: Arc<dyn Serializer>,
        identity: AgentIdentity,
    ) -> Result<Self, BatcherError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BatcherError::Runtime)?;

        let (tx, rx) = mpsc::unbounded_channel();
        info!(
            max_capacity = config.max_capacity,
            hostname = %identity.hostname,
            agent = %identity.agent_name,
            "starting topology batcher"
        );

        let actor = BatcherActor {
            builder: TopologyBuilder::new(config.max_capacity),
            serializer,
            identity,
            rx,
        };
        let task = runtime.spawn(actor.run());

        Ok(Self {
            handle: BatcherHandle { tx },
            task,
        })
    }

    /// 제출 핸들을 반환합니다.
    pub fn handle(&self) -> BatcherHandle {
        self.handle.clone()
    }

    /// 액터 상태를 반환합니다.
    pub fn health(&self) -> HealthStatus {
        if self.task.is_finished() || self.handle.is_closed() {
            HealthStatus::Unhealthy("batcher actor stopped".to_owned())
        } else {
            HealthStatus::Healthy
        }
    }

    /// 새 제출을 막고, 이미 수락된 명령을 모두 적용한 뒤 남은 버퍼를 플러시합니다.
    ///
    /// 마지막 배치가 직렬화기에 전달된 후에 반환합니다.
    pub async fn shutdown(self) -> Result<(), BatcherError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let sent = self.handle.tx.send(BatcherCommand::Shutdown { ack: ack_tx });
        drop(self.handle);

        let acked = sent.is_ok() && ack_rx.await.is_ok();

        if let Err(e) = self.task.await {
            warn!(error = %e, "batcher task terminated abnormally");
            return Err(BatcherError::Stopped);
        }

        if acked {
            info!("topology batcher stopped");
            Ok(())
        } else {
            Err(BatcherError::Stopped)
        }
    }
}

/// 버퍼를 단독 소유하는 액터 상태
struct BatcherActor {
    builder: TopologyBuilder,
    serializer: Arc<dyn Serializer>,
    identity: AgentIdentity,
    rx: mpsc::UnboundedReceiver<BatcherCommand>,
}

impl BatcherActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                BatcherCommand::Submit(submission) => self.apply(submission),
                BatcherCommand::Shutdown { ack } => {
                    self.drain_and_stop(vec![ack]).await;
                    return;
                }
            }
        }

        // 모든 핸들이 드롭됨
        debug!("all batcher handles dropped");
        self.flush_remaining();
    }

    async fn drain_and_stop(&mut self, mut acks: Vec<oneshot::Sender<()>>) {
        self.rx.close();

        while let Some(command) = self.rx.recv().await {
            match command {
                BatcherCommand::Submit(submission) => self.apply(submission),
                BatcherCommand::Shutdown { ack } => acks.push(ack),
            }
        }

        self.flush_remaining();
        for ack in acks {
            let _ = ack.send(());
        }
    }

    fn apply(&mut self, submission: Submission) {
        match submission {
            Submission::StartSnapshot { check_id, instance } => {
                self.builder.mark_start(check_id, instance);
            }
            Submission::StopSnapshot { check_id, instance } => {
                self.builder.mark_stop(check_id, instance);
                self.flush(FlushTrigger::StopSnapshot);
            }
            Submission::Component {
                check_id,
                instance,
                component,
            } => {
                self.builder.add_component(check_id, instance, component);
                self.flush_if_over_capacity();
            }
            Submission::Relation {
                check_id,
                instance,
                relation,
            } => {
                self.builder.add_relation(check_id, instance, relation);
                self.flush_if_over_capacity();
            }
            Submission::Complete { check_id } => {
                if self.builder.contains(&check_id) {
                    self.flush(FlushTrigger::Complete);
                } else {
                    debug!(check_id = %check_id, "complete for check without buffered topology, ignoring");
                }
            }
        }

        metrics::gauge!(m::BATCHER_BUFFERED_ELEMENTS).set(self.builder.element_count() as f64);
    }

    fn flush_if_over_capacity(&mut self) {
        if self.builder.is_over_capacity() {
            self.flush(FlushTrigger::Capacity);
        }
    }

    fn flush_remaining(&mut self) {
        if !self.builder.is_empty() {
            self.flush(FlushTrigger::Shutdown);
        }
    }

    fn flush(&mut self, trigger: FlushTrigger) {
        let element_count = self.builder.element_count();
        let topologies = self.builder.flush();
        if topologies.is_empty() {
            return;
        }

        let batch = TopologyBatch::new(&self.identity, topologies);
        debug!(
            batch_id = %batch.batch_id,
            trigger = %trigger,
            topologies = batch.topologies.len(),
            elements = element_count,
            "flushing topology batch"
        );

        metrics::counter!(m::BATCHER_FLUSHES_TOTAL, m::LABEL_TRIGGER => trigger.as_str())
            .increment(1);
        metrics::counter!(m::BATCHER_FLUSHED_ELEMENTS_TOTAL).increment(element_count as u64);
        metrics::gauge!(m::BATCHER_BUFFERED_ELEMENTS).set(0.0);

        let batch_id = batch.batch_id;
        if let Err(e) = self.serializer.send_topology(batch) {
            warn!(
                batch_id = %batch_id,
                trigger = %trigger,
                error = %e,
                "failed to hand topology batch to serializer"
            );
            metrics::counter!(m::BATCHER_SERIALIZER_ERRORS_TOTAL).increment(1);
        }
    }
}
