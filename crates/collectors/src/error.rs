//! 수집기 에러 타입
//!
//! [`CollectorError`]는 토폴로지 체크 실행 중 발생하는 에러를 표현합니다.
//! 주기 실행 루프는 이 에러를 로깅/카운트만 하고 다음 주기를 계속 실행합니다.

use topoagent_core::error::{AgentError, ConfigError};

/// 수집기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Docker 데몬 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<CollectorError> for AgentError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Config { field, reason } => {
                AgentError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => AgentError::Collector(other.to_string()),
        }
    }
}
