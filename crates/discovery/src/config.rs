//! 탐지 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`DiscoveryConfig`](inventa_core::config::DiscoveryConfig)를
//! 경로 타입으로 변환하고 엔진 고유 설정(결과 채널 용량)을 추가합니다.
//!
//! # 사용 예시
//!
//! ```
//! use inventa_discovery::EngineConfigBuilder;
//!
//! let config = EngineConfigBuilder::new()
//!     .library_dir("/var/lib/inventa/library")
//!     .scan_dir("/var/lib/inventa/scans")
//!     .workers(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.effective_workers(), 4);
//! ```

use std::path::{Path, PathBuf};

use inventa_core::config::{DiscoveryConfig, MAX_SCAN_FILE_SIZE_LIMIT, MAX_WORKERS};

use crate::error::DiscoveryError;

/// 결과 채널 용량 상한
const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// 탐지 엔진 설정
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 탐지 라이브러리 디렉토리
    pub library_dir: PathBuf,
    /// 규칙 파일명
    pub rules_file: String,
    /// 버전 제외 파일명
    pub exclusions_file: String,
    /// 시그니처 파일명
    pub signatures_file: String,
    /// 스캔 루트 디렉토리
    pub scan_dir: PathBuf,
    /// 스캔 파일 확장자 (점 제외)
    pub scan_extension: String,
    /// 결과 출력 디렉토리
    pub output_dir: PathBuf,
    /// 워커 수 (0 = 자동)
    pub workers: usize,
    /// 스캔 파일 최대 크기 (바이트)
    pub max_scan_file_size: u64,
    /// 이전 실행 결과로 소스 카탈로그를 미리 채울지 여부
    pub seed_sources: bool,

    // --- 엔진 고유 확장 ---
    /// 워커 → 결과 기록 태스크 채널 용량
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_core(&DiscoveryConfig::default())
    }
}

impl EngineConfig {
    /// core의 `DiscoveryConfig`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &DiscoveryConfig) -> Self {
        Self {
            library_dir: PathBuf::from(&core.library_dir),
            rules_file: core.rules_file.clone(),
            exclusions_file: core.exclusions_file.clone(),
            signatures_file: core.signatures_file.clone(),
            scan_dir: PathBuf::from(&core.scan_dir),
            scan_extension: core.scan_extension.clone(),
            output_dir: PathBuf::from(&core.output_dir),
            workers: core.workers,
            max_scan_file_size: core.max_scan_file_size,
            seed_sources: core.seed_sources,
            channel_capacity: 1024,
        }
    }

    /// 규칙 파일 경로
    pub fn rules_path(&self) -> PathBuf {
        self.library_dir.join(&self.rules_file)
    }

    /// 버전 제외 파일 경로
    pub fn exclusions_path(&self) -> PathBuf {
        self.library_dir.join(&self.exclusions_file)
    }

    /// 시그니처 파일 경로
    pub fn signatures_path(&self) -> PathBuf {
        self.library_dir.join(&self.signatures_file)
    }

    /// 실제 사용할 워커 수
    ///
    /// 0이면 가용 병렬성의 절반을 사용하며 최소 1입니다.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (parallelism / 2).max(1)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - 디렉토리 경로: 비어 있지 않음, `..` 포함 금지
    /// - `output_dir`: 실행마다 삭제되므로 `scan_dir`, `library_dir`와 겹치지 않음
    /// - `workers`: 0(자동) 또는 1-1024
    /// - `max_scan_file_size`: 1-1GB
    /// - `channel_capacity`: 1-65536
    /// - `scan_extension`: 비어 있지 않고 점으로 시작하지 않음
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        for (field, path) in [
            ("library_dir", &self.library_dir),
            ("scan_dir", &self.scan_dir),
            ("output_dir", &self.output_dir),
        ] {
            validate_dir(field, path)?;
        }

        let output = normalize(&self.output_dir);
        for (field, path) in [("scan_dir", &self.scan_dir), ("library_dir", &self.library_dir)] {
            let other = normalize(path);
            if other.starts_with(&output) || output.starts_with(&other) {
                return Err(DiscoveryError::Config {
                    field: "output_dir".to_owned(),
                    reason: format!(
                        "'{}' overlaps {field} '{}'",
                        self.output_dir.display(),
                        path.display()
                    ),
                });
            }
        }

        if self.workers > MAX_WORKERS {
            return Err(DiscoveryError::Config {
                field: "workers".to_owned(),
                reason: format!("must be 0 (auto) or 1-{MAX_WORKERS}"),
            });
        }

        if self.max_scan_file_size == 0 || self.max_scan_file_size > MAX_SCAN_FILE_SIZE_LIMIT {
            return Err(DiscoveryError::Config {
                field: "max_scan_file_size".to_owned(),
                reason: format!("must be 1-{MAX_SCAN_FILE_SIZE_LIMIT}"),
            });
        }

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(DiscoveryError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        if self.scan_extension.is_empty() || self.scan_extension.starts_with('.') {
            return Err(DiscoveryError::Config {
                field: "scan_extension".to_owned(),
                reason: "must be a bare extension such as 'scan'".to_owned(),
            });
        }

        Ok(())
    }
}

fn validate_dir(field: &str, path: &Path) -> Result<(), DiscoveryError> {
    if path.as_os_str().is_empty() {
        return Err(DiscoveryError::Config {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }
    if path
        .components()
        .any(|c| c == std::path::Component::ParentDir)
    {
        return Err(DiscoveryError::Config {
            field: field.to_owned(),
            reason: format!("'{}' contains path traversal pattern '..'", path.display()),
        });
    }
    Ok(())
}

/// 현재 디렉토리 기준 절대 경로로 만들고 `.` 구성요소를 제거합니다.
///
/// `..`는 [`validate_dir`]에서 이미 거부되므로 어휘적 비교로 충분합니다.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute
        .components()
        .filter(|c| *c != std::path::Component::CurDir)
        .collect()
}

/// [`EngineConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// core 설정에서 시작하는 빌더를 생성합니다.
    pub fn from_core(core: &DiscoveryConfig) -> Self {
        Self {
            config: EngineConfig::from_core(core),
        }
    }

    /// 라이브러리 디렉토리를 설정합니다.
    pub fn library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.library_dir = dir.into();
        self
    }

    /// 스캔 디렉토리를 설정합니다.
    pub fn scan_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scan_dir = dir.into();
        self
    }

    /// 출력 디렉토리를 설정합니다.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// 스캔 파일 확장자를 설정합니다.
    pub fn scan_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.scan_extension = ext.into();
        self
    }

    /// 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// 스캔 파일 최대 크기를 설정합니다.
    pub fn max_scan_file_size(mut self, size: u64) -> Self {
        self.config.max_scan_file_size = size;
        self
    }

    /// 소스 카탈로그 시딩 여부를 설정합니다.
    pub fn seed_sources(mut self, seed: bool) -> Self {
        self.config.seed_sources = seed;
        self
    }

    /// 결과 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `DiscoveryError::Config` 반환
    pub fn build(self) -> Result<EngineConfig, DiscoveryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = DiscoveryConfig {
            library_dir: "/lib".to_owned(),
            scan_dir: "/scans".to_owned(),
            output_dir: "/out".to_owned(),
            workers: 3,
            seed_sources: true,
            ..Default::default()
        };
        let config = EngineConfig::from_core(&core);
        assert_eq!(config.library_dir, PathBuf::from("/lib"));
        assert_eq!(config.rules_path(), PathBuf::from("/lib/DiscoveryRules.txt"));
        assert_eq!(config.exclusions_path(), PathBuf::from("/lib/DiscoveryVERs.txt"));
        assert_eq!(config.workers, 3);
        assert!(config.seed_sources);
        // 확장 필드는 기본값
        assert_eq!(config.channel_capacity, 1024);
    }

    #[test]
    fn effective_workers_auto_is_at_least_one() {
        let config = EngineConfig::default();
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn effective_workers_explicit() {
        let config = EngineConfigBuilder::new().workers(7).build().unwrap();
        assert_eq!(config.effective_workers(), 7);
    }

    #[test]
    fn builder_rejects_traversal() {
        assert!(EngineConfigBuilder::new().scan_dir("../scans").build().is_err());
    }

    #[test]
    fn builder_rejects_empty_output_dir() {
        assert!(EngineConfigBuilder::new().output_dir("").build().is_err());
    }

    #[test]
    fn builder_rejects_zero_channel_capacity() {
        assert!(EngineConfigBuilder::new().channel_capacity(0).build().is_err());
    }

    #[test]
    fn builder_rejects_too_many_workers() {
        assert!(EngineConfigBuilder::new().workers(MAX_WORKERS + 1).build().is_err());
    }

    #[test]
    fn builder_rejects_output_equal_to_scan_dir() {
        let err = EngineConfigBuilder::new()
            .scan_dir("/data/scans")
            .output_dir("/data/scans")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn builder_rejects_output_equal_to_library_dir() {
        assert!(
            EngineConfigBuilder::new()
                .library_dir("/data/library")
                .output_dir("/data/library/")
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_rejects_output_containing_input_dirs() {
        assert!(
            EngineConfigBuilder::new()
                .scan_dir("/data/scans")
                .output_dir("/data")
                .build()
                .is_err()
        );
        assert!(
            EngineConfigBuilder::new()
                .library_dir("/data/library")
                .scan_dir("/other/scans")
                .output_dir("/data")
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_rejects_output_inside_scan_dir() {
        assert!(
            EngineConfigBuilder::new()
                .scan_dir("scans")
                .output_dir("./scans/results")
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_accepts_sibling_output_dir() {
        EngineConfigBuilder::new()
            .library_dir("/data/library")
            .scan_dir("/data/scans")
            .output_dir("/data/results")
            .build()
            .unwrap();
    }

    #[test]
    fn builder_rejects_dotted_extension() {
        assert!(EngineConfigBuilder::new().scan_extension(".scan").build().is_err());
    }
}
