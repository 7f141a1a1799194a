//! 배처 에러 타입
//!
//! [`BatcherError`]는 배처 생성, 직렬화, 전송 큐 전달 과정의 에러를 표현합니다.
//! `From<BatcherError> for AgentError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 제출 API(`submit_*`)는 호출자에게 에러를 반환하지 않습니다.
//! 직렬화/전송 실패는 배처 액터 내부에서 로깅되고 카운트됩니다.

use topoagent_core::error::{AgentError, ConfigError, PipelineError};

/// 배처 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum BatcherError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 인테이크 메시지 인코딩 실패
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// 전송 큐가 가득 참
    #[error("transport queue is full")]
    QueueFull,

    /// 전송 큐 수신측이 닫힘
    #[error("transport queue is closed")]
    QueueClosed,

    /// tokio 런타임 컨텍스트 밖에서 생성 시도
    #[error("no tokio runtime available to spawn the batcher")]
    Runtime,

    /// 배처 액터가 이미 종료됨
    #[error("batcher has stopped")]
    Stopped,
}

impl From<BatcherError> for AgentError {
    fn from(err: BatcherError) -> Self {
        match err {
            BatcherError::Config { field, reason } => {
                AgentError::Config(ConfigError::InvalidValue { field, reason })
            }
            BatcherError::Runtime => AgentError::Pipeline(PipelineError::InitFailed(
                "no tokio runtime available".to_owned(),
            )),
            BatcherError::Stopped => AgentError::Pipeline(PipelineError::NotRunning),
            other => AgentError::Pipeline(PipelineError::ChannelSend(other.to_string())),
        }
    }
}
