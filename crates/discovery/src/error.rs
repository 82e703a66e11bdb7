//! 탐지 엔진 에러 타입
//!
//! [`DiscoveryError`]는 탐지 엔진 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<DiscoveryError> for InventaError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **라이브러리**: `LibraryLoad`, `InvalidRecord`, `Pattern`
//! - **제외 그래프**: `ExclusionCycle`
//! - **스캔**: `ScanRead`, `FileTooBig`, `Worker`
//! - **출력**: `Output`, `Channel`
//! - **설정**: `Config`

use inventa_core::error::{ConfigError, InventaError, LibraryError, ScanError};

use crate::types::VersionId;

/// 탐지 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// 라이브러리 파일 열기/읽기 실패
    #[error("library load error: {path}: {source}")]
    LibraryLoad {
        /// 라이브러리 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 라이브러리 레코드 파싱 실패
    #[error("invalid record: {path}:{line}: {reason}")]
    InvalidRecord {
        /// 라이브러리 파일 경로
        path: String,
        /// 1부터 시작하는 라인 번호
        line: usize,
        /// 파싱 실패 사유
        reason: String,
    },

    /// glob 패턴 컴파일 실패
    #[error("pattern error: '{pattern}': {reason}")]
    Pattern {
        /// 원본 glob 패턴
        pattern: String,
        /// 컴파일 실패 사유
        reason: String,
    },

    /// 제외 그래프 순환
    #[error("exclusion cycle through version {version}")]
    ExclusionCycle {
        /// 순환에 포함된 버전
        version: VersionId,
    },

    /// 스캔 파일 읽기 실패
    #[error("scan read error: {path}: {source}")]
    ScanRead {
        /// 스캔 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 스캔 파일 크기 초과
    #[error("scan too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 스캔 파일 경로
        path: String,
        /// 실제 크기 (바이트)
        size: u64,
        /// 최대 허용 크기 (바이트)
        max: u64,
    },

    /// 워커 태스크 실패 (panic 포함)
    #[error("worker error: {0}")]
    Worker(String),

    /// 결과 파일 쓰기 실패
    #[error("output error: {path}: {source}")]
    Output {
        /// 출력 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<DiscoveryError> for InventaError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::LibraryLoad { path, source } => {
                InventaError::Library(LibraryError::LoadFailed {
                    path,
                    reason: source.to_string(),
                })
            }
            DiscoveryError::InvalidRecord { path, line, reason } => {
                InventaError::Library(LibraryError::InvalidRecord { path, line, reason })
            }
            DiscoveryError::Pattern { pattern, reason } => {
                InventaError::Library(LibraryError::LoadFailed {
                    path: pattern,
                    reason,
                })
            }
            DiscoveryError::ExclusionCycle { version } => {
                InventaError::Library(LibraryError::Cycle(format!("version {version}")))
            }
            DiscoveryError::ScanRead { path, source } => {
                InventaError::Scan(ScanError::ReadFailed {
                    path,
                    reason: source.to_string(),
                })
            }
            DiscoveryError::FileTooBig { path, size, max } => {
                InventaError::Scan(ScanError::ReadFailed {
                    path,
                    reason: format!("{size} bytes exceeds limit of {max}"),
                })
            }
            DiscoveryError::Worker(msg) => InventaError::Scan(ScanError::Worker(msg)),
            DiscoveryError::Output { path, source } => {
                InventaError::Scan(ScanError::Output(format!("{path}: {source}")))
            }
            DiscoveryError::Channel(msg) => InventaError::Scan(ScanError::Output(msg)),
            DiscoveryError::Config { field, reason } => {
                InventaError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
