//! 에러 타입 — 도메인별 에러 정의

/// Inventa 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum InventaError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 탐지 라이브러리(규칙/제외/시그니처) 에러
    #[error("library error: {0}")]
    Library(#[from] LibraryError),

    /// 스캔 처리 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 탐지 라이브러리 에러
///
/// 라이브러리 없이는 실행을 진행할 수 없으므로 모두 치명적입니다.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// 라이브러리 파일 로드 실패
    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// 라이브러리 레코드 파싱 실패
    #[error("{path}:{line}: {reason}")]
    InvalidRecord {
        path: String,
        line: usize,
        reason: String,
    },

    /// 제외 그래프 순환
    #[error("exclusion cycle: {0}")]
    Cycle(String),
}

/// 스캔 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 스캔 파일 읽기 실패
    #[error("failed to read scan {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    /// 워커 태스크 실패
    #[error("worker failed: {0}")]
    Worker(String),

    /// 결과 출력 실패
    #[error("output failed: {0}")]
    Output(String),
}
