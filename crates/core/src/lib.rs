//! topoagent 공통 크레이트
//!
//! 토폴로지 엔티티, 설정, 에러, 메트릭 이름, 건강 상태를 정의합니다.
//! 배처, 수집기, 데몬 크레이트가 모두 이 크레이트에 의존합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod topology;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{AgentError, ConfigError, PipelineError};

// 설정
pub use config::AgentConfig;

// 상태
pub use pipeline::HealthStatus;

// 토폴로지 엔티티
pub use topology::{
    CheckId, Component, Data, DataValue, Instance, Relation, Topology, TopologyType,
};
