//! 제출 API -- 수집기가 의존하는 유일한 인터페이스
//!
//! 수집기는 전역 배처 대신 생성 시점에 `Arc<dyn TopologySubmitter>`를 주입받습니다.
//!
//! - [`BatcherHandle`](crate::batcher::BatcherHandle): 실행 중인 배처 액터로 전달
//! - [`NoopSubmitter`]: 배처가 비활성화된 경우 모든 제출을 버림
//! - [`MockBatcher`]: 테스트용, 제출을 메모리에 기록만 하고 자동 플러시하지 않음

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use topoagent_core::topology::{CheckId, Component, Instance, Relation, Topology};

use crate::batcher::AsyncBatcher;
use crate::buffer::TopologyBuilder;

/// 토폴로지 제출 인터페이스
///
/// 모든 메서드는 동기이며 실패하지 않고, 플러시를 기다리지 않습니다.
/// tokio 태스크와 일반 OS 스레드 양쪽에서 호출할 수 있습니다.
pub trait TopologySubmitter: Send + Sync {
    /// 스냅샷 시작을 표시합니다.
    fn submit_start_snapshot(&self, check_id: CheckId, instance: Instance);

    /// 스냅샷 종료를 표시하고 버퍼 전체를 플러시합니다.
    fn submit_stop_snapshot(&self, check_id: CheckId, instance: Instance);

    /// 컴포넌트를 추가합니다.
    fn submit_component(&self, check_id: CheckId, instance: Instance, component: Component);

    /// 릴레이션을 추가합니다.
    fn submit_relation(&self, check_id: CheckId, instance: Instance, relation: Relation);

    /// 체크 실행 완료를 알립니다. 버퍼에 해당 체크가 있으면 전체를 플러시합니다.
    fn submit_complete(&self, check_id: CheckId);
}

/// 실행 중인 배처가 있으면 그 핸들을, 없으면 [`NoopSubmitter`]를 반환합니다.
pub fn submitter_for(batcher: Option<&AsyncBatcher>) -> Arc<dyn TopologySubmitter> {
    match batcher {
        Some(batcher) => Arc::new(batcher.handle()),
        None => Arc::new(NoopSubmitter),
    }
}

/// 모든 제출을 버리는 제출자
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSubmitter;

impl TopologySubmitter for NoopSubmitter {
    fn submit_start_snapshot(&self, check_id: CheckId, _instance: Instance) {
        tracing::trace!(check_id = %check_id, "batcher disabled, dropping start snapshot");
    }

    fn submit_stop_snapshot(&self, check_id: CheckId, _instance: Instance) {
        tracing::trace!(check_id = %check_id, "batcher disabled, dropping stop snapshot");
    }

    fn submit_component(&self, check_id: CheckId, _instance: Instance, _component: Component) {
        tracing::trace!(check_id = %check_id, "batcher disabled, dropping component");
    }

    fn submit_relation(&self, check_id: CheckId, _instance: Instance, _relation: Relation) {
        tracing::trace!(check_id = %check_id, "batcher disabled, dropping relation");
    }

    fn submit_complete(&self, check_id: CheckId) {
        tracing::trace!(check_id = %check_id, "batcher disabled, dropping complete");
    }
}

/// 테스트용 동기 배처
///
/// 제출을 자체 [`TopologyBuilder`]에 기록하며, 용량이나 종료/완료 신호로
/// 플러시하지 않습니다. 테스트는 [`flush`](Self::flush) 또는
/// [`topology`](Self::topology)로 결과를 검사합니다.
#[derive(Debug)]
pub struct MockBatcher {
    collected: Mutex<TopologyBuilder>,
    completed: Mutex<Vec<CheckId>>,
}

impl Default for MockBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBatcher {
    /// 빈 Mock 배처를 생성합니다.
    pub fn new() -> Self {
        Self {
            collected: Mutex::new(TopologyBuilder::new(usize::MAX)),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// 기록된 스냅샷을 삽입 순서대로 꺼냅니다.
    pub fn flush(&self) -> Vec<Topology> {
        self.builder().flush()
    }

    /// 체크의 현재 스냅샷 복사본을 반환합니다.
    pub fn topology(&self, check_id: &CheckId) -> Option<Topology> {
        self.builder().get(check_id).cloned()
    }

    /// `submit_complete`가 호출된 체크 ID 목록 (호출 순서)
    pub fn completed(&self) -> Vec<CheckId> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 기록된 컴포넌트+릴레이션 총합
    pub fn element_count(&self) -> usize {
        self.builder().element_count()
    }

    fn builder(&self) -> MutexGuard<'_, TopologyBuilder> {
        // 테스트 스레드가 panic 해도 기록은 계속 검사할 수 있어야 함
        self.collected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TopologySubmitter for MockBatcher {
    fn submit_start_snapshot(&self, check_id: CheckId, instance: Instance) {
        self.builder().mark_start(check_id, instance);
    }

    fn submit_stop_snapshot(&self, check_id: CheckId, instance: Instance) {
        self.builder().mark_stop(check_id, instance);
    }

    fn submit_component(&self, check_id: CheckId, instance: Instance, component: Component) {
        self.builder().add_component(check_id, instance, component);
    }

    fn submit_relation(&self, check_id: CheckId, instance: Instance, relation: Relation) {
        self.builder().add_relation(check_id, instance, relation);
    }

    fn submit_complete(&self, check_id: CheckId) {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(check_id);
    }
}
