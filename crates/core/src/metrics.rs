//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `inventa_`
//! - 모듈명: `discovery_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 유형 레이블 키 (file, addremove, pkginst)
pub const LABEL_SOURCE_TYPE: &str = "source_type";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Discovery 메트릭 ──────────────────────────────────────────────

/// Discovery: 처리된 스캔 수 (counter, label: result)
pub const DISCOVERY_SCANS_PROCESSED_TOTAL: &str = "inventa_discovery_scans_processed_total";

/// Discovery: 읽은 소스 레코드 수 (counter, label: source_type)
pub const DISCOVERY_SOURCES_READ_TOTAL: &str = "inventa_discovery_sources_read_total";

/// Discovery: 건너뛴 잘못된 스캔 라인 수 (counter)
pub const DISCOVERY_MALFORMED_LINES_TOTAL: &str = "inventa_discovery_malformed_lines_total";

/// Discovery: 확정된 탐지 수 (counter)
pub const DISCOVERY_DETECTIONS_CONFIRMED_TOTAL: &str =
    "inventa_discovery_detections_confirmed_total";

/// Discovery: 버전 제외로 제거된 탐지 수 (counter)
pub const DISCOVERY_DETECTIONS_EXCLUDED_TOTAL: &str =
    "inventa_discovery_detections_excluded_total";

/// Discovery: 제외 그래프 순환 감지 수 (counter)
pub const DISCOVERY_EXCLUSION_CYCLES_TOTAL: &str = "inventa_discovery_exclusion_cycles_total";

/// Discovery: 시그니처 누락 수 (counter)
pub const DISCOVERY_MISSING_SIGNATURES_TOTAL: &str =
    "inventa_discovery_missing_signatures_total";

/// Discovery: 스캔 처리 시간 (histogram, 초)
pub const DISCOVERY_SCAN_DURATION_SECONDS: &str = "inventa_discovery_scan_duration_seconds";

/// Discovery: 로드된 규칙 수 (gauge)
pub const DISCOVERY_RULES_LOADED: &str = "inventa_discovery_rules_loaded";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스캔 처리 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 60s 범위 (스캔 파일 읽기 포함)
pub const SCAN_DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 10.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        DISCOVERY_SCANS_PROCESSED_TOTAL,
        "Total number of scans processed, by result"
    );
    describe_counter!(
        DISCOVERY_SOURCES_READ_TOTAL,
        "Total number of inventory source records read from scans"
    );
    describe_counter!(
        DISCOVERY_MALFORMED_LINES_TOTAL,
        "Total number of malformed scan lines skipped"
    );
    describe_counter!(
        DISCOVERY_DETECTIONS_CONFIRMED_TOTAL,
        "Total number of confirmed per-scan detections"
    );
    describe_counter!(
        DISCOVERY_DETECTIONS_EXCLUDED_TOTAL,
        "Total number of detections dropped by version exclusion"
    );
    describe_counter!(
        DISCOVERY_EXCLUSION_CYCLES_TOTAL,
        "Total number of exclusion graph cycles encountered during resolution"
    );
    describe_counter!(
        DISCOVERY_MISSING_SIGNATURES_TOTAL,
        "Total number of confirmed detections without a signature"
    );
    describe_histogram!(
        DISCOVERY_SCAN_DURATION_SECONDS,
        "Time to load and match a single scan in seconds"
    );
    describe_gauge!(
        DISCOVERY_RULES_LOADED,
        "Number of discovery rules currently loaded"
    );
}
