//! topoagent 토폴로지 체크
//!
//! 외부 API의 데이터를 공통 토폴로지 모델로 변환하여
//! 주입받은 [`TopologySubmitter`](topoagent_batcher::TopologySubmitter)로 제출합니다.
//!
//! # 모듈 구성
//!
//! - [`collector`]: 체크 ID/인스턴스 쌍, [`TopologyCheck`] trait, 주기 실행 루프
//! - [`docker`]: Docker API 추상화 (bollard)
//! - [`docker_topology`]: Docker 컨테이너 토폴로지 체크
//! - [`error`]: 도메인 에러 타입

pub mod collector;
pub mod docker;
pub mod docker_topology;
pub mod error;

// --- 주요 타입 re-export ---

pub use collector::{CheckTopologyCollector, TopologyCheck, spawn_periodic};
pub use docker::{BollardDockerClient, ContainerInfo, DockerClient, MountInfo};
pub use docker_topology::{DOCKER_TOPOLOGY_CHECK_NAME, DockerTopologyCollector};
pub use error::CollectorError;
