//! Docker 컨테이너 토폴로지 체크
//!
//! 실행 중인 컨테이너마다 `container` 컴포넌트 하나를 제출하고,
//! 마지막에 `submit_complete`로 배치 플러시를 요청합니다.
//!
//! # 컴포넌트 형식
//! ```text
//! externalId: urn:container:/<container id>
//! type:       container
//! data:       type, containerID, name, image, mounts, state, health
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use topoagent_batcher::TopologySubmitter;
use topoagent_core::topology::{Component, DataValue, Instance};

use crate::collector::{CheckTopologyCollector, TopologyCheck};
use crate::docker::{ContainerInfo, DockerClient, MountInfo};
use crate::error::CollectorError;

/// 체크 ID
pub const DOCKER_TOPOLOGY_CHECK_NAME: &str = "docker_topology";

/// 컨테이너 컴포넌트 타입
pub const CONTAINER_TYPE: &str = "container";

/// 컨테이너 런타임 이름 (컴포넌트 data의 `type`)
const CONTAINER_RUNTIME: &str = "docker";

/// Docker 토폴로지 수집기
pub struct DockerTopologyCollector<D: DockerClient> {
    collector: CheckTopologyCollector,
    docker: Arc<D>,
}

impl<D: DockerClient> DockerTopologyCollector<D> {
    /// 새 수집기를 생성합니다.
    pub fn new(docker: Arc<D>) -> Self {
        Self {
            collector: CheckTopologyCollector::new(
                DOCKER_TOPOLOGY_CHECK_NAME,
                Instance::new("docker", "agents"),
            ),
            docker,
        }
    }

    /// 체크 ID/인스턴스 쌍
    pub fn collector(&self) -> &CheckTopologyCollector {
        &self.collector
    }

    /// 실행 중인 컨테이너 목록을 컴포넌트로 변환합니다.
    pub async fn collect_containers(&self) -> Result<Vec<Component>, CollectorError> {
        let containers = self.docker.list_containers().await?;
        Ok(containers.iter().map(container_component).collect())
    }

    /// 컨테이너 토폴로지를 수집하여 제출합니다.
    ///
    /// 목록 조회가 실패하면 아무것도 제출하지 않습니다.
    pub async fn build_container_topology(
        &self,
        submitter: &dyn TopologySubmitter,
    ) -> Result<(), CollectorError> {
        let components = self.collect_containers().await?;
        debug!(containers = components.len(), "submitting docker container topology");

        for component in components {
            self.collector.submit_component(submitter, component);
        }
        self.collector.submit_complete(submitter);
        Ok(())
    }
}

impl<D: DockerClient> TopologyCheck for DockerTopologyCollector<D> {
    fn name(&self) -> &str {
        DOCKER_TOPOLOGY_CHECK_NAME
    }

    async fn run(&self, submitter: &dyn TopologySubmitter) -> Result<(), CollectorError> {
        self.build_container_topology(submitter).await
    }
}

/// 컨테이너 하나를 토폴로지 컴포넌트로 변환합니다.
pub fn container_component(container: &ContainerInfo) -> Component {
    let mounts: Vec<DataValue> = container.mounts.iter().map(mount_value).collect();

    Component::new(
        format!("urn:{CONTAINER_TYPE}:/{}", container.id),
        CONTAINER_TYPE,
    )
    .with_data("type", CONTAINER_RUNTIME)
    .with_data("containerID", container.id.as_str())
    .with_data("name", container.name.as_str())
    .with_data("image", container.image.as_str())
    .with_data("mounts", mounts)
    .with_data("state", container.state.as_str())
    .with_data("health", container.health())
}

fn mount_value(mount: &MountInfo) -> DataValue {
    let mut map = BTreeMap::new();
    map.insert("Source".to_owned(), DataValue::from(mount.source.as_str()));
    map.insert(
        "Destination".to_owned(),
        DataValue::from(mount.destination.as_str()),
    );
    map.insert("Mode".to_owned(), DataValue::from(mount.mode.as_str()));
    map.insert("RW".to_owned(), DataValue::from(mount.read_write));
    DataValue::Map(map)
}
