//! 배처 설정
//!
//! [`BatcherConfig`]는 core의 `[batcher]` 섹션에서 생성되며,
//! 배처 생성 시점에 한 번 검증됩니다.

use crate::error::BatcherError;

/// 기본 최대 용량 (컴포넌트+릴레이션 수)
pub const DEFAULT_MAX_CAPACITY: usize = 1000;

/// 배처 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 자동 플러시 임계값
    pub max_capacity: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl BatcherConfig {
    /// 지정한 용량으로 설정을 생성합니다.
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            max_capacity,
            ..Self::default()
        }
    }

    /// core의 `BatcherConfig`에서 배처 설정을 생성합니다.
    ///
    /// 환경변수 오버라이드는 core 설정 로딩 단계에서 이미 적용되어 있습니다.
    pub fn from_core(core: &topoagent_core::config::BatcherConfig) -> Self {
        Self {
            enabled: core.enabled,
            max_capacity: core.max_capacity,
        }
    }

    /// 설정값을 검증합니다.
    pub fn validate(&self) -> Result<(), BatcherError> {
        if self.max_capacity == 0 {
            return Err(BatcherError::Config {
                field: "max_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}
