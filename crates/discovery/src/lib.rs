//! inventa-discovery: 스캔 파일에서 설치 소프트웨어를 식별하는 탐지 엔진
//!
//! 탐지 라이브러리(규칙, 제외 관계, 시그니처)를 한 번 로드한 뒤, 스캔 파일을
//! 워커 풀에서 병렬로 처리하여 확정된 제품 버전을 결과 파일로 출력합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 타입 (`DiscoveryError`)
//! - [`config`]: 엔진 설정 (`EngineConfig`, builder)
//! - [`types`]: 도메인 타입 (`SourceType`, `Source`, ID newtype)
//! - [`pattern`]: 속성 매칭 (`AttrSpec`, `Glob`)
//! - [`rules`]: 탐지 규칙 인덱스 (`RuleIndex`, `Rule`)
//! - [`exclusion`]: 버전 간 제외 그래프 (`ExclusionGraph`)
//! - [`signature`]: 제품 메타데이터 (`SignatureCatalog`, `Signature`)
//! - [`library`]: 라이브러리 파일 로더 (`Library`)
//! - [`scan`]: 스캔 파일 파서와 탐색 (`parse_scan`, `find_scans`)
//! - [`catalog`]: 실행 전역 소스 카탈로그 (`SourceCatalog`)
//! - [`aggregate`]: 실행 전역 탐지 집계 (`ResultAggregator`)
//! - [`matcher`]: 스캔 단위 매칭/결합/가지치기/제외 (`ScanMatcher`)
//! - [`writer`]: 결과 파일 출력 (`ResultWriter`)
//! - [`engine`]: 스캔 스케줄러 (`DiscoveryEngine`)
//!
//! # Architecture
//!
//! ```text
//! library_dir --> Library (RuleIndex, ExclusionGraph, SignatureCatalog)
//!                    |
//! scan_dir --> find_scans --> Semaphore(workers) --> process_scan
//!                                                       |
//!                    +----------------------------------+------------------+
//!                    |                                  |                  |
//!              SourceCatalog                       ScanMatcher      ResultAggregator
//!                    |                                  |                  |
//!         aggregate_<type>.txt               mpsc --> ResultWriter   results_aggregate.txt
//!         unused_<type>.txt                   results.txt, verbose_<type>.txt
//! ```

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod library;
pub mod matcher;
pub mod pattern;
pub mod rules;
pub mod scan;
pub mod signature;
pub mod types;
pub mod writer;

// --- Public API Re-exports ---

// Engine (scheduler)
pub use engine::{
    DiscoveryContext, DiscoveryEngine, RunSummary, ScanOutcome, ScanStats, process_scan,
};

// Configuration
pub use config::{EngineConfig, EngineConfigBuilder};

// Error
pub use error::DiscoveryError;

// Library
pub use exclusion::ExclusionGraph;
pub use library::{Library, LibraryStats};
pub use rules::{Rule, RuleDef, RuleIndex};
pub use signature::{Signature, SignatureCatalog};

// Matching
pub use matcher::{Detection, DetectionKey, DetectionSet, Match, ScanMatcher, ScanResult};

// Run-wide state
pub use aggregate::{AggregateDetection, ResultAggregator};
pub use catalog::SourceCatalog;

// Types
pub use types::{BuildId, RuleId, Source, SourceId, SourceKey, SourceType, VersionId};
