//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐
//! │ DockerTopologyCollector │
//! └────────────┬────────────┘
//!              │
//!              ▼
//!       ┌─────────────┐
//!       │DockerClient │ (trait)
//!       └─────────────┘
//!          │       │
//!          ▼       ▼
//!     ┌───────┐ ┌──────┐
//!     │Bollard│ │ Mock │
//!     └───┬───┘ └──────┘
//!         │
//!         ▼
//!    Docker Daemon
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::CollectorError;

/// A mount attached to a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Host path or volume source
    pub source: String,
    /// Path inside the container
    pub destination: String,
    /// Mount mode as reported by Docker (e.g. "rw", "ro,Z")
    pub mode: String,
    /// Whether the mount is writable
    pub read_write: bool,
}

/// A running container as seen by the topology check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Full container ID
    pub id: String,
    /// Container name without the leading slash
    pub name: String,
    /// Image reference
    pub image: String,
    /// Machine-readable state ("running", "paused", ...)
    pub state: String,
    /// Human-readable status ("Up 2 hours (healthy)")
    pub status: String,
    /// Attached mounts
    pub mounts: Vec<MountInfo>,
}

impl ContainerInfo {
    /// Health derived from the Docker status string.
    pub fn health(&self) -> &'static str {
        container_health(&self.status)
    }
}

/// Maps a Docker status string to a health value.
///
/// Docker appends `(healthy)`, `(unhealthy)` or `(health: starting)` to the
/// status of containers that define a health check.
pub fn container_health(status: &str) -> &'static str {
    if status.contains("(unhealthy)") {
        "unhealthy"
    } else if status.contains("(healthy)") {
        "healthy"
    } else if status.contains("(health: starting)") {
        "starting"
    } else {
        "none"
    }
}

/// Trait abstracting the Docker API operations the topology check needs.
///
/// # Implementations
///
/// - [`BollardDockerClient`]: Production implementation using the `bollard` library
/// - `MockDockerClient`: Test implementation with configurable responses (available in tests only)
pub trait DockerClient: Send + Sync + 'static {
    /// Lists running containers.
    ///
    /// Stopped/exited containers are not returned.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::DockerApi` if the Docker API call fails.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerInfo>, CollectorError>> + Send;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), CollectorError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for sharing across async tasks.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::DockerConnection` if the connection fails.
    pub fn connect_local() -> Result<Self, CollectorError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            CollectorError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::DockerConnection` if the connection fails.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, CollectorError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    CollectorError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, CollectorError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| CollectorError::DockerApi(format!("list containers failed: {e}")))?;

        let result = containers
            .into_iter()
            .map(|container| {
                let name = container
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_owned())
                    .unwrap_or_default();
                let mounts = container
                    .mounts
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| MountInfo {
                        source: m.source.unwrap_or_default(),
                        destination: m.destination.unwrap_or_default(),
                        mode: m.mode.unwrap_or_default(),
                        read_write: m.rw.unwrap_or(false),
                    })
                    .collect();

                ContainerInfo {
                    id: container.id.unwrap_or_default(),
                    name,
                    image: container.image.unwrap_or_default(),
                    state: container.state.unwrap_or_default(),
                    status: container.status.unwrap_or_default(),
                    mounts,
                }
            })
            .collect();

        Ok(result)
    }

    async fn ping(&self) -> Result<(), CollectorError> {
        self.docker
            .ping()
            .await
            .map_err(|e| CollectorError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 설정 가능한 응답을 반환하여 Docker 없이도 테스트할 수 있습니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// list_containers 호출 시 반환할 컨테이너 목록
    pub containers: Vec<ContainerInfo>,
    /// API 호출 실패를 시뮬레이션할지 여부
    pub fail_api: bool,
}

#[cfg(test)]
impl MockDockerClient {
    /// 빈 컨테이너 목록으로 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트용 컨테이너를 설정합니다.
    pub fn with_containers(mut self, containers: Vec<ContainerInfo>) -> Self {
        self.containers = containers;
        self
    }

    /// API 호출이 실패하도록 설정합니다.
    pub fn with_failing_api(mut self) -> Self {
        self.fail_api = true;
        self
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, CollectorError> {
        if self.fail_api {
            return Err(CollectorError::DockerApi("mock failure".to_owned()));
        }
        Ok(self.containers.clone())
    }

    async fn ping(&self) -> Result<(), CollectorError> {
        if self.fail_api {
            return Err(CollectorError::DockerConnection("mock failure".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_container(id: &str, name: &str, status: &str) -> ContainerInfo {
    ContainerInfo {
        id: id.to_owned(),
        name: name.to_owned(),
        image: "nginx:latest".to_owned(),
        state: "running".to_owned(),
        status: status.to_owned(),
        mounts: vec![MountInfo {
            source: "/srv/www".to_owned(),
            destination: "/usr/share/nginx/html".to_owned(),
            mode: "ro".to_owned(),
            read_write: false,
        }],
    }
}
