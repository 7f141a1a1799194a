//! 파이프라인 공통 타입 — 상태 보고

use std::fmt;

use serde::{Deserialize, Serialize};

/// 컴포넌트 건강 상태
///
/// 배처, 전송 큐, 수집기가 보고하며 데몬이 집계합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 성능 저하 (사유 포함)
    Degraded(String),
    /// 비정상 (사유 포함)
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("slow".to_owned()).is_healthy());
        assert!(!HealthStatus::Degraded("slow".to_owned()).is_unhealthy());
        assert!(HealthStatus::Unhealthy("down".to_owned()).is_unhealthy());
    }

    #[test]
    fn health_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(
            HealthStatus::Unhealthy("actor stopped".to_owned()).to_string(),
            "unhealthy: actor stopped"
        );
    }
}
