//! topoagent 비동기 토폴로지 배처
//!
//! 여러 수집기가 동시에 제출하는 토폴로지를 체크별 스냅샷으로 모아,
//! 용량/종료/완료/셧다운 시점에 하나의 배치로 직렬화기에 넘깁니다.
//!
//! # 모듈 구성
//!
//! - [`buffer`]: 체크별 스냅샷 버퍼 ([`TopologyBuilder`])
//! - [`batcher`]: 액터 태스크와 제출 핸들, 플러시 트리거
//! - [`submitter`]: 제출 인터페이스 및 Noop/Mock 구현, 명시적 바인딩
//! - [`serializer`]: 직렬화 경계, v1 인테이크 인코딩, 전송 큐
//! - [`config`]: 배처 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Collectors --submit_*--> BatcherHandle --mpsc--> BatcherActor(TopologyBuilder)
//!                                                        |
//!                                          flush trigger |
//!                                                        v
//!                                   Serializer::send_topology(TopologyBatch)
//!                                                        |
//!                                      JsonSerializer -> transport queue
//! ```

pub mod batcher;
pub mod buffer;
pub mod config;
pub mod error;
pub mod serializer;
pub mod submitter;

// --- 주요 타입 re-export ---

// 배처
pub use batcher::{AsyncBatcher, BatcherHandle, FlushTrigger};

// 버퍼
pub use buffer::TopologyBuilder;

// 설정
pub use config::BatcherConfig;

// 에러
pub use error::BatcherError;

// 직렬화
pub use serializer::{
    AgentIdentity, EncodedPayload, JsonSerializer, MockSerializer, Serializer, TopologyBatch,
};

// 제출
pub use submitter::{MockBatcher, NoopSubmitter, TopologySubmitter, submitter_for};
