//! 직렬화 경계 -- 플러시된 배치를 인테이크 메시지로 변환하여 전송 큐에 전달
//!
//! 배처 액터는 플러시할 때마다 [`TopologyBatch`]를 만들어
//! [`Serializer::send_topology`]를 호출합니다. 호출은 항상 액터 태스크에서만
//! 이루어지므로 구현체는 동시 호출을 고려할 필요가 없습니다.
//!
//! # 인테이크 메시지 (v1)
//! ```text
//! {"internalHostname": "<host>", "topologies": [<Topology>, ...]}
//! ```

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use topoagent_core::config::GeneralConfig;
use topoagent_core::topology::Topology;

use crate::error::BatcherError;

/// 프로세스 식별 정보 (모든 배치에 포함)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// 보고용 호스트명
    pub hostname: String,
    /// 에이전트 이름 (`topoagent/<버전>`)
    pub agent_name: String,
}

impl AgentIdentity {
    /// 호스트명으로 식별 정보를 생성합니다.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            agent_name: default_agent_name(),
        }
    }

    /// core 일반 설정에서 식별 정보를 생성합니다.
    pub fn from_config(general: &GeneralConfig) -> Self {
        Self::new(general.resolve_hostname())
    }
}

/// `topoagent/<크레이트 버전>`
pub fn default_agent_name() -> String {
    format!("topoagent/{}", env!("CARGO_PKG_VERSION"))
}

/// 플러시 한 번에 해당하는 전송 단위
#[derive(Debug, Clone)]
pub struct TopologyBatch {
    /// 배치 상관관계 ID
    pub batch_id: Uuid,
    /// 보고용 호스트명
    pub hostname: String,
    /// 에이전트 이름
    pub agent_name: String,
    /// 체크 ID 최초 삽입 순서의 스냅샷 목록
    pub topologies: Vec<Topology>,
}

impl TopologyBatch {
    /// 새 배치 ID로 배치를 생성합니다.
    pub fn new(identity: &AgentIdentity, topologies: Vec<Topology>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            hostname: identity.hostname.clone(),
            agent_name: identity.agent_name.clone(),
            topologies,
        }
    }

    /// 배치 내 컴포넌트+릴레이션 총합
    pub fn element_count(&self) -> usize {
        self.topologies.iter().map(Topology::element_count).sum()
    }

    /// v1 인테이크 메시지 뷰를 반환합니다.
    pub fn intake_message(&self) -> IntakeMessage<'_> {
        IntakeMessage {
            internal_hostname: &self.hostname,
            topologies: &self.topologies,
        }
    }
}

/// v1 인테이크 메시지
#[derive(Debug, Serialize)]
pub struct IntakeMessage<'a> {
    #[serde(rename = "internalHostname")]
    pub internal_hostname: &'a str,
    pub topologies: &'a [Topology],
}

/// 배치를 인테이크 메시지로 인코딩합니다.
pub fn encode_intake(batch: &TopologyBatch) -> Result<Bytes, BatcherError> {
    let body = serde_json::to_vec(&batch.intake_message())?;
    Ok(Bytes::from(body))
}

/// 플러시된 배치를 받아 하위 전송 계층으로 넘기는 경계
pub trait Serializer: Send + Sync {
    /// 배치를 전달합니다. 실패는 배처가 로깅/카운트만 하고 재시도하지 않습니다.
    fn send_topology(&self, batch: TopologyBatch) -> Result<(), BatcherError>;
}

/// 전송 큐로 넘어가는 인코딩된 페이로드
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// 원본 배치 ID
    pub batch_id: Uuid,
    /// 에이전트 이름 (전송 헤더용)
    pub agent_name: String,
    /// JSON 본문
    pub body: Bytes,
}

/// JSON 인코딩 후 bounded 전송 큐로 넘기는 직렬화기
///
/// 큐가 가득 차면 기다리지 않고 [`BatcherError::QueueFull`]을 반환합니다.
pub struct JsonSerializer {
    tx: mpsc::Sender<EncodedPayload>,
}

impl JsonSerializer {
    /// 기존 전송 큐 송신측으로 직렬화기를 생성합니다.
    pub fn new(tx: mpsc::Sender<EncodedPayload>) -> Self {
        Self { tx }
    }

    /// 전송 큐를 함께 생성합니다.
    pub fn channel(queue_capacity: usize) -> (Self, mpsc::Receiver<EncodedPayload>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl Serializer for JsonSerializer {
    fn send_topology(&self, batch: TopologyBatch) -> Result<(), BatcherError> {
        let body = encode_intake(&batch)?;
        let payload = EncodedPayload {
            batch_id: batch.batch_id,
            agent_name: batch.agent_name,
            body,
        };

        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BatcherError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => BatcherError::QueueClosed,
        })
    }
}

/// 테스트용 직렬화기
///
/// 받은 배치를 인테이크 메시지 JSON 값으로 보관합니다.
pub struct MockSerializer {
    tx: mpsc::UnboundedSender<serde_json::Value>,
    rx: Mutex<mpsc::UnboundedReceiver<serde_json::Value>>,
}

impl Default for MockSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerializer {
    /// 빈 Mock 직렬화기를 생성합니다.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// 다음 인테이크 메시지를 기다립니다. 시간 안에 없으면 `None`.
    pub async fn next_intake_message(&self, timeout: Duration) -> Option<serde_json::Value> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    /// 이미 도착한 메시지를 기다리지 않고 꺼냅니다.
    pub fn try_next_intake_message(&self) -> Option<serde_json::Value> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }
}

impl Serializer for MockSerializer {
    fn send_topology(&self, batch: TopologyBatch) -> Result<(), BatcherError> {
        let value = serde_json::to_value(batch.intake_message())?;
        self.tx.send(value).map_err(|_| BatcherError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topoagent_core::topology::{Component, Instance};

    fn sample_batch() -> TopologyBatch {
        let mut topology = Topology::new(Instance::new("mytype", "myurl"));
        topology.start_snapshot = true;
        topology
            .components
            .push(Component::new("id", "typename").with_data("replicas", 2));
        TopologyBatch::new(&AgentIdentity::new("myhost"), vec![topology])
    }

    #[test]
    fn agent_name_carries_version() {
        let identity = AgentIdentity::new("myhost");
        assert!(identity.agent_name.starts_with("topoagent/"));
        assert_eq!(identity.hostname, "myhost");
    }

    #[test]
    fn intake_message_shape() {
        let batch = sample_batch();
        let value = serde_json::to_value(batch.intake_message()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "internalHostname": "myhost",
                "topologies": [{
                    "start_snapshot": true,
                    "stop_snapshot": false,
                    "instance": {"type": "mytype", "url": "myurl"},
                    "components": [{
                        "externalId": "id",
                        "type": {"name": "typename"},
                        "data": {"replicas": 2}
                    }],
                    "relations": []
                }]
            })
        );
    }

    #[test]
    fn batch_element_count() {
        let batch = sample_batch();
        assert_eq!(batch.element_count(), 1);
    }

    #[test]
    fn batches_get_distinct_ids() {
        let identity = AgentIdentity::new("h");
        let a = TopologyBatch::new(&identity, Vec::new());
        let b = TopologyBatch::new(&identity, Vec::new());
        assert_ne!(a.batch_id, b.batch_id);
    }

    #[tokio::test]
    async fn json_serializer_enqueues_payload() {
        let (serializer, mut rx) = JsonSerializer::channel(4);
        let batch = sample_batch();
        let batch_id = batch.batch_id;

        serializer.send_topology(batch).unwrap();

        let payload = rx.try_recv().unwrap();
        assert_eq!(payload.batch_id, batch_id);
        assert!(payload.agent_name.starts_with("topoagent/"));
        let decoded: serde_json::Value = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(decoded["internalHostname"], "myhost");
        assert_eq!(decoded["topologies"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn json_serializer_reports_full_queue() {
        let (serializer, _rx) = JsonSerializer::channel(1);
        serializer.send_topology(sample_batch()).unwrap();

        let err = serializer.send_topology(sample_batch()).unwrap_err();
        assert!(matches!(err, BatcherError::QueueFull));
    }

    #[tokio::test]
    async fn json_serializer_reports_closed_queue() {
        let (serializer, rx) = JsonSerializer::channel(1);
        drop(rx);

        let err = serializer.send_topology(sample_batch()).unwrap_err();
        assert!(matches!(err, BatcherError::QueueClosed));
    }

    #[tokio::test]
    async fn mock_serializer_records_messages() {
        let mock = MockSerializer::new();
        assert!(mock.try_next_intake_message().is_none());

        mock.send_topology(sample_batch()).unwrap();

        let message = mock
            .next_intake_message(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(message["internalHostname"], "myhost");
        assert!(
            mock.next_intake_message(Duration::from_millis(10))
                .await
                .is_none()
        );
    }

    #[test]
    fn check_id_is_not_part_of_the_wire_topology() {
        let value = serde_json::to_value(sample_batch().intake_message()).unwrap();
        assert!(value["topologies"][0].get("check_id").is_none());
    }
}
