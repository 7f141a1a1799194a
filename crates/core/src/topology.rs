//! 토폴로지 도메인 타입 — 수집기와 배처가 공유하는 데이터 모델
//!
//! 수집기는 외부 API(Docker, Kubernetes 등)의 데이터를 이 타입들로 변환하여
//! 배처에 제출합니다. 이 모듈은 동작 없이 데이터만 정의합니다.
//!
//! # 와이어 필드 이름
//! 직렬화 시 필드 이름은 백엔드 intake 형식을 따릅니다.
//!
//! ```text
//! Topology  -> start_snapshot, stop_snapshot, instance, components, relations
//! Instance  -> type, url
//! Component -> externalId, type{name}, data
//! Relation  -> externalId, type{name}, sourceId, targetId, data
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 체크 인스턴스 식별자
///
/// 제출을 그룹화하는 키입니다. 형식 검증은 하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(String);

impl CheckId {
    /// 새 체크 ID를 생성합니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 문자열 참조를 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CheckId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 스냅샷이 속한 토폴로지 "세계" (클러스터, Docker 호스트 등)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    /// 인스턴스 유형 태그 (예: `"kubernetes"`, `"docker-swarm"`)
    #[serde(rename = "type")]
    pub instance_type: String,
    /// 구분자 URL (임의 문자열)
    pub url: String,
}

impl Instance {
    /// 새 인스턴스를 생성합니다.
    pub fn new(instance_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.instance_type, self.url)
    }
}

/// 컴포넌트/릴레이션 유형 태그
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyType {
    /// 유형 이름 (예: `"kubernetes-pod"`, `"creates"`)
    pub name: String,
}

impl TopologyType {
    /// 새 유형 태그를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// 컴포넌트/릴레이션에 첨부되는 메타데이터 값
///
/// 닫힌 variant 집합으로 임의 형태의 페이로드를 표현합니다.
/// JSON으로는 태그 없이 평범한 값으로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// 불리언
    Bool(bool),
    /// 정수
    Integer(i64),
    /// 부동소수점
    Float(f64),
    /// 문자열
    String(String),
    /// 시퀀스
    List(Vec<DataValue>),
    /// 중첩 매핑
    Map(BTreeMap<String, DataValue>),
}

/// 문자열 키 -> [`DataValue`] 정렬 매핑
pub type Data = BTreeMap<String, DataValue>;

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for DataValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<DataValue>> From<Vec<T>> for DataValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, DataValue>> for DataValue {
    fn from(v: BTreeMap<String, DataValue>) -> Self {
        Self::Map(v)
    }
}

/// 토폴로지 노드
///
/// `external_id`는 호출자가 지정하며, 이 계층에서는 유일성을 강제하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// 외부 식별자
    #[serde(rename = "externalId")]
    pub external_id: String,
    /// 컴포넌트 유형
    #[serde(rename = "type")]
    pub component_type: TopologyType,
    /// 메타데이터
    #[serde(default)]
    pub data: Data,
}

impl Component {
    /// 빈 데이터로 컴포넌트를 생성합니다.
    pub fn new(external_id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            component_type: TopologyType::new(type_name),
            data: Data::new(),
        }
    }

    /// 메타데이터 항목을 추가합니다.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// 방향성 있는 토폴로지 간선
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// 외부 식별자
    #[serde(rename = "externalId")]
    pub external_id: String,
    /// 출발 컴포넌트 외부 식별자
    #[serde(rename = "sourceId")]
    pub source_id: String,
    /// 도착 컴포넌트 외부 식별자
    #[serde(rename = "targetId")]
    pub target_id: String,
    /// 릴레이션 유형
    #[serde(rename = "type")]
    pub relation_type: TopologyType,
    /// 메타데이터
    #[serde(default)]
    pub data: Data,
}

impl Relation {
    /// 새 릴레이션을 생성합니다.
    pub fn new(
        external_id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: TopologyType::new(type_name),
            data: Data::new(),
        }
    }

    /// `source->target` 형식의 외부 식별자로 릴레이션을 생성합니다.
    pub fn between(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        let external_id = format!("{source_id}->{target_id}");
        Self::new(external_id, source_id, target_id, type_name)
    }

    /// 메타데이터 항목을 추가합니다.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// 체크 하나의 토폴로지 스냅샷
///
/// 마지막 플러시 이후 해당 체크가 제출한 컴포넌트/릴레이션과
/// 스냅샷 시작/종료 플래그를 담습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// 스냅샷 시작 여부
    pub start_snapshot: bool,
    /// 스냅샷 종료 여부
    pub stop_snapshot: bool,
    /// 소속 인스턴스
    pub instance: Instance,
    /// 제출 순서대로의 컴포넌트
    pub components: Vec<Component>,
    /// 제출 순서대로의 릴레이션
    pub relations: Vec<Relation>,
}

impl Topology {
    /// 플래그가 꺼진 빈 스냅샷을 생성합니다.
    pub fn new(instance: Instance) -> Self {
        Self {
            start_snapshot: false,
            stop_snapshot: false,
            instance,
            components: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// 컴포넌트 + 릴레이션 수
    pub fn element_count(&self) -> usize {
        self.components.len() + self.relations.len()
    }
}
