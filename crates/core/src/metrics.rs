//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `topoagent_`
//! - 컴포넌트명: `batcher_`, `forwarder_`, `collector_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(topoagent_core::metrics::BATCHER_FLUSHES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 제출 종류 레이블 키 (start_snapshot, stop_snapshot, component, relation, complete)
pub const LABEL_KIND: &str = "kind";

/// 플러시 트리거 레이블 키 (capacity, stop_snapshot, complete, shutdown)
pub const LABEL_TRIGGER: &str = "trigger";

/// 체크 이름 레이블 키
pub const LABEL_CHECK: &str = "check";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Batcher 메트릭 ─────────────────────────────────────────────────

/// Batcher: 수락된 제출 수 (counter, label: kind)
pub const BATCHER_SUBMISSIONS_TOTAL: &str = "topoagent_batcher_submissions_total";

/// Batcher: 플러시 횟수 (counter, label: trigger)
pub const BATCHER_FLUSHES_TOTAL: &str = "topoagent_batcher_flushes_total";

/// Batcher: 플러시된 컴포넌트+릴레이션 수 (counter)
pub const BATCHER_FLUSHED_ELEMENTS_TOTAL: &str = "topoagent_batcher_flushed_elements_total";

/// Batcher: 현재 버퍼에 담긴 컴포넌트+릴레이션 수 (gauge)
pub const BATCHER_BUFFERED_ELEMENTS: &str = "topoagent_batcher_buffered_elements";

/// Batcher: 직렬화기 전달 실패 수 (counter)
pub const BATCHER_SERIALIZER_ERRORS_TOTAL: &str = "topoagent_batcher_serializer_errors_total";

/// Batcher: 종료 후 도착해 버려진 제출 수 (counter)
pub const BATCHER_DROPPED_SUBMISSIONS_TOTAL: &str = "topoagent_batcher_dropped_submissions_total";

// ─── Forwarder 메트릭 ───────────────────────────────────────────────

/// Forwarder: 전송 큐에서 꺼낸 페이로드 수 (counter)
pub const FORWARDER_PAYLOADS_TOTAL: &str = "topoagent_forwarder_payloads_total";

/// Forwarder: 전송된 바이트 수 (counter)
pub const FORWARDER_BYTES_TOTAL: &str = "topoagent_forwarder_bytes_total";

// ─── Collector 메트릭 ───────────────────────────────────────────────

/// Collector: 체크 실행 수 (counter, labels: check, result)
pub const COLLECTOR_RUNS_TOTAL: &str = "topoagent_collector_runs_total";

/// Collector: 체크 실행 에러 수 (counter, label: check)
pub const COLLECTOR_ERRORS_TOTAL: &str = "topoagent_collector_errors_total";

/// Collector: 체크 1회 실행 소요 시간 (histogram, 초)
pub const COLLECTOR_RUN_DURATION_SECONDS: &str = "topoagent_collector_run_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "topoagent_daemon_uptime_seconds";

/// Daemon: 실행 중인 체크 수 (gauge)
pub const DAEMON_CHECKS_RUNNING: &str = "topoagent_daemon_checks_running";

/// Daemon: 빌드 정보 (gauge, 항상 1, labels: version, rust_version)
pub const DAEMON_BUILD_INFO: &str = "topoagent_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 체크 실행 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 60s 범위 (Docker API 호출 포함)
pub const RUN_DURATION_BUCKETS: [f64; 10] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `topoagent-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Batcher
    describe_counter!(
        BATCHER_SUBMISSIONS_TOTAL,
        "Total number of topology submissions accepted by the batcher"
    );
    describe_counter!(
        BATCHER_FLUSHES_TOTAL,
        "Total number of batches flushed, by trigger"
    );
    describe_counter!(
        BATCHER_FLUSHED_ELEMENTS_TOTAL,
        "Total number of components and relations flushed"
    );
    describe_gauge!(
        BATCHER_BUFFERED_ELEMENTS,
        "Current number of components and relations waiting in the buffer"
    );
    describe_counter!(
        BATCHER_SERIALIZER_ERRORS_TOTAL,
        "Total number of batches the serializer failed to accept"
    );
    describe_counter!(
        BATCHER_DROPPED_SUBMISSIONS_TOTAL,
        "Total number of submissions dropped because the batcher had stopped"
    );

    // Forwarder
    describe_counter!(
        FORWARDER_PAYLOADS_TOTAL,
        "Total number of encoded payloads drained from the transport queue"
    );
    describe_counter!(FORWARDER_BYTES_TOTAL, "Total encoded payload bytes");

    // Collectors
    describe_counter!(COLLECTOR_RUNS_TOTAL, "Total number of topology check runs");
    describe_counter!(
        COLLECTOR_ERRORS_TOTAL,
        "Total number of failed topology check runs"
    );
    describe_histogram!(
        COLLECTOR_RUN_DURATION_SECONDS,
        "Time to complete a single topology check run in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "topoagent daemon uptime in seconds");
    describe_gauge!(
        DAEMON_CHECKS_RUNNING,
        "Number of topology checks running in the daemon"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version labels)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        BATCHER_SUBMISSIONS_TOTAL,
        BATCHER_FLUSHES_TOTAL,
        BATCHER_FLUSHED_ELEMENTS_TOTAL,
        BATCHER_BUFFERED_ELEMENTS,
        BATCHER_SERIALIZER_ERRORS_TOTAL,
        BATCHER_DROPPED_SUBMISSIONS_TOTAL,
        FORWARDER_PAYLOADS_TOTAL,
        FORWARDER_BYTES_TOTAL,
        COLLECTOR_RUNS_TOTAL,
        COLLECTOR_ERRORS_TOTAL,
        COLLECTOR_RUN_DURATION_SECONDS,
        DAEMON_UPTIME_SECONDS,
        DAEMON_CHECKS_RUNNING,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_topoagent_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("topoagent_"),
                "Metric '{}' does not start with 'topoagent_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            BATCHER_SUBMISSIONS_TOTAL,
            BATCHER_FLUSHES_TOTAL,
            BATCHER_FLUSHED_ELEMENTS_TOTAL,
            BATCHER_SERIALIZER_ERRORS_TOTAL,
            BATCHER_DROPPED_SUBMISSIONS_TOTAL,
            FORWARDER_PAYLOADS_TOTAL,
            FORWARDER_BYTES_TOTAL,
            COLLECTOR_RUNS_TOTAL,
            COLLECTOR_ERRORS_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' lacks _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않아도 panic 하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_KIND, LABEL_TRIGGER, LABEL_CHECK, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn run_duration_buckets_are_sorted() {
        let buckets = RUN_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
