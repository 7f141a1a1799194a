//! 스냅샷 버퍼 -- 체크별 토폴로지 누적 및 용량 추적
//!
//! [`TopologyBuilder`]는 마지막 플러시 이후 제출된 토폴로지를 체크 ID별로 모읍니다.
//! 동시성 제어는 하지 않으며, 배처 액터 태스크 하나가 단독으로 소유합니다.
//!
//! # 불변식
//! - `element_count`는 항상 모든 스냅샷의 컴포넌트+릴레이션 수 합과 같습니다.
//! - 플러시 결과는 체크 ID가 처음 제출된 순서를 따릅니다.
//! - 플러시 후 버퍼는 완전히 비워집니다.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use topoagent_core::topology::{CheckId, Component, Instance, Relation, Topology};

/// 체크별 토폴로지 스냅샷 버퍼
#[derive(Debug)]
pub struct TopologyBuilder {
    /// 체크 ID -> 스냅샷
    topologies: HashMap<CheckId, Topology>,
    /// 체크 ID 최초 삽입 순서
    order: Vec<CheckId>,
    /// 버퍼 내 컴포넌트+릴레이션 총합
    element_count: usize,
    /// 자동 플러시 임계값
    max_capacity: usize,
}

impl TopologyBuilder {
    /// 새 버퍼를 생성합니다.
    pub fn new(max_capacity: usize) -> Self {
        Self {
            topologies: HashMap::new(),
            order: Vec::new(),
            element_count: 0,
            max_capacity,
        }
    }

    /// 체크의 스냅샷을 반환하며, 없으면 새로 생성합니다.
    ///
    /// 이미 존재하는 스냅샷의 인스턴스는 교체하지 않습니다 (최초 제출 우선).
    pub fn get_or_create(&mut self, check_id: CheckId, instance: Instance) -> &mut Topology {
        match self.topologies.entry(check_id) {
            Entry::Occupied(entry) => {
                let topology = entry.into_mut();
                if topology.instance != instance {
                    tracing::debug!(
                        existing = %topology.instance,
                        submitted = %instance,
                        "instance differs from buffered snapshot, keeping the first"
                    );
                }
                topology
            }
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(Topology::new(instance))
            }
        }
    }

    /// 컴포넌트를 추가하고 카운트를 증가시킵니다.
    pub fn add_component(&mut self, check_id: CheckId, instance: Instance, component: Component) {
        self.get_or_create(check_id, instance)
            .components
            .push(component);
        self.element_count += 1;
    }

    /// 릴레이션을 추가하고 카운트를 증가시킵니다.
    pub fn add_relation(&mut self, check_id: CheckId, instance: Instance, relation: Relation) {
        self.get_or_create(check_id, instance)
            .relations
            .push(relation);
        self.element_count += 1;
    }

    /// 스냅샷 시작 플래그를 설정합니다 (멱등).
    pub fn mark_start(&mut self, check_id: CheckId, instance: Instance) {
        self.get_or_create(check_id, instance).start_snapshot = true;
    }

    /// 스냅샷 종료 플래그를 설정합니다 (멱등).
    pub fn mark_stop(&mut self, check_id: CheckId, instance: Instance) {
        self.get_or_create(check_id, instance).stop_snapshot = true;
    }

    /// 체크의 스냅샷이 버퍼에 있는지 확인합니다.
    pub fn contains(&self, check_id: &CheckId) -> bool {
        self.topologies.contains_key(check_id)
    }

    /// 체크의 스냅샷 참조를 반환합니다.
    pub fn get(&self, check_id: &CheckId) -> Option<&Topology> {
        self.topologies.get(check_id)
    }

    /// 모든 스냅샷을 삽입 순서대로 꺼내고 버퍼를 초기화합니다.
    pub fn flush(&mut self) -> Vec<Topology> {
        let order = std::mem::take(&mut self.order);
        let mut topologies = std::mem::take(&mut self.topologies);
        self.element_count = 0;

        order
            .into_iter()
            .filter_map(|check_id| topologies.remove(&check_id))
            .collect()
    }

    /// 카운트가 임계값 이상인지 확인합니다.
    pub fn is_over_capacity(&self) -> bool {
        self.element_count >= self.max_capacity
    }

    /// 버퍼 내 컴포넌트+릴레이션 총합
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// 버퍼 내 스냅샷(체크) 수
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 자동 플러시 임계값
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }
}
