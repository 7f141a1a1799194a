//! 설정 관리 — topoagent.toml 파싱 및 런타임 설정
//!
//! [`AgentConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TOPOAGENT_BATCHER_MAX_CAPACITY=500` 형식)
//! 3. 설정 파일 (`topoagent.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), topoagent_core::error::AgentError> {
//! use topoagent_core::config::AgentConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = AgentConfig::load("topoagent.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = AgentConfig::parse("[batcher]\nmax_capacity = 200")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AgentError, ConfigError};

/// 배처 용량 환경변수 (시작 시 한 번 읽음)
pub const BATCHER_MAX_CAPACITY_ENV: &str = "TOPOAGENT_BATCHER_MAX_CAPACITY";

/// topoagent 통합 설정
///
/// `topoagent.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 토폴로지 배처 설정
    #[serde(default)]
    pub batcher: BatcherConfig,
    /// 전송 큐 설정
    #[serde(default)]
    pub forwarder: ForwarderConfig,
    /// Docker 토폴로지 체크 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AgentConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AgentError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, AgentError> {
        toml::from_str(toml_str).map_err(|e| {
            AgentError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TOPOAGENT_{SECTION}_{FIELD}`
    ///
    /// 대부분의 필드는 파싱 실패 시 경고 후 무시하지만,
    /// 배처 용량은 잘못된 값이면 에러를 반환합니다.
    pub fn apply_env_overrides(&mut self) -> Result<(), AgentError> {
        // General
        override_string(&mut self.general.log_level, "TOPOAGENT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TOPOAGENT_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.hostname, "TOPOAGENT_GENERAL_HOSTNAME");
        override_string(&mut self.general.pid_file, "TOPOAGENT_GENERAL_PID_FILE");

        // Batcher
        override_bool(&mut self.batcher.enabled, "TOPOAGENT_BATCHER_ENABLED");
        override_capacity(&mut self.batcher.max_capacity, BATCHER_MAX_CAPACITY_ENV)?;

        // Forwarder
        override_usize(
            &mut self.forwarder.queue_capacity,
            "TOPOAGENT_FORWARDER_QUEUE_CAPACITY",
        );

        // Docker
        override_bool(&mut self.docker.enabled, "TOPOAGENT_DOCKER_ENABLED");
        override_string(&mut self.docker.docker_socket, "TOPOAGENT_DOCKER_SOCKET");
        override_u64(
            &mut self.docker.collection_interval_secs,
            "TOPOAGENT_DOCKER_COLLECTION_INTERVAL_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TOPOAGENT_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "TOPOAGENT_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "TOPOAGENT_METRICS_PORT");

        Ok(())
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AgentError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 용량 0은 용량 기반 플러시를 사실상 끄게 되므로 거부
        if self.batcher.max_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batcher.max_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.forwarder.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "forwarder.queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.docker.enabled {
            if self.docker.collection_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "docker.collection_interval_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
            if self.docker.docker_socket.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "docker.docker_socket".to_owned(),
                    reason: "socket path must not be empty when docker is enabled".to_owned(),
                }
                .into());
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 보고용 호스트명 (비어 있으면 `HOSTNAME` 환경변수 사용)
    pub hostname: String,
    /// PID 파일 경로 (비어 있으면 생성하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            hostname: String::new(),
            pid_file: "/var/run/topoagent/topoagent.pid".to_owned(),
        }
    }
}

impl GeneralConfig {
    /// 보고용 호스트명을 결정합니다.
    ///
    /// 설정값 -> `HOSTNAME` 환경변수 -> `"localhost"` 순서로 선택합니다.
    pub fn resolve_hostname(&self) -> String {
        if !self.hostname.is_empty() {
            return self.hostname.clone();
        }
        match std::env::var("HOSTNAME") {
            Ok(name) if !name.trim().is_empty() => name.trim().to_owned(),
            _ => "localhost".to_owned(),
        }
    }
}

/// 토폴로지 배처 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// 활성화 여부 (비활성화 시 제출은 no-op으로 버려짐)
    pub enabled: bool,
    /// 자동 플러시 전 버퍼에 담을 최대 컴포넌트+릴레이션 수
    pub max_capacity: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 1000,
        }
    }
}

/// 전송 큐 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// 직렬화된 페이로드 큐 용량
    pub queue_capacity: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self { queue_capacity: 100 }
    }
}

/// Docker 토폴로지 체크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// 수집 주기 (초)
    pub collection_interval_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            docker_socket: "/var/run/docker.sock".to_owned(),
            collection_interval_secs: 30,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

/// 용량 오버라이드는 다른 필드와 달리 잘못된 값을 무시하지 않습니다.
fn override_capacity(target: &mut usize, env_key: &str) -> Result<(), ConfigError> {
    let Ok(val) = std::env::var(env_key) else {
        return Ok(());
    };

    let parsed = val
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidValue {
            field: "batcher.max_capacity".to_owned(),
            reason: format!("{env_key}='{val}' is not an integer"),
        })?;

    if parsed <= 0 {
        return Err(ConfigError::InvalidValue {
            field: "batcher.max_capacity".to_owned(),
            reason: format!("{env_key}={parsed} must be a positive integer"),
        });
    }

    *target = usize::try_from(parsed).map_err(|_| ConfigError::InvalidValue {
        field: "batcher.max_capacity".to_owned(),
        reason: format!("{env_key}={parsed} does not fit in usize"),
    })?;
    Ok(())
}
