//! 설정 관리 — inventa.toml 파싱 및 런타임 설정
//!
//! [`InventaConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`INVENTA_DISCOVERY_SCAN_DIR=/data/scans` 형식)
//! 3. 설정 파일 (`inventa.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), inventa_core::error::InventaError> {
//! use inventa_core::config::InventaConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = InventaConfig::load("inventa.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = InventaConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, InventaError};

/// 워커 수 상한
pub const MAX_WORKERS: usize = 1024;

/// 스캔 파일 최대 허용 크기 상한 (1 GB)
pub const MAX_SCAN_FILE_SIZE_LIMIT: u64 = 1024 * 1024 * 1024;

/// 경로 길이 제한
const MAX_PATH_LEN: usize = 4096;

/// Inventa 통합 설정
///
/// `inventa.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventaConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 소프트웨어 탐지 설정
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl InventaConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, InventaError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, InventaError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InventaError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                InventaError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, InventaError> {
        toml::from_str(toml_str).map_err(|e| {
            InventaError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `INVENTA_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "INVENTA_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "INVENTA_GENERAL_LOG_FORMAT");

        // Discovery
        override_string(
            &mut self.discovery.library_dir,
            "INVENTA_DISCOVERY_LIBRARY_DIR",
        );
        override_string(
            &mut self.discovery.rules_file,
            "INVENTA_DISCOVERY_RULES_FILE",
        );
        override_string(
            &mut self.discovery.exclusions_file,
            "INVENTA_DISCOVERY_EXCLUSIONS_FILE",
        );
        override_string(
            &mut self.discovery.signatures_file,
            "INVENTA_DISCOVERY_SIGNATURES_FILE",
        );
        override_string(&mut self.discovery.scan_dir, "INVENTA_DISCOVERY_SCAN_DIR");
        override_string(
            &mut self.discovery.scan_extension,
            "INVENTA_DISCOVERY_SCAN_EXTENSION",
        );
        override_string(
            &mut self.discovery.output_dir,
            "INVENTA_DISCOVERY_OUTPUT_DIR",
        );
        override_usize(&mut self.discovery.workers, "INVENTA_DISCOVERY_WORKERS");
        override_u64(
            &mut self.discovery.max_scan_file_size,
            "INVENTA_DISCOVERY_MAX_SCAN_FILE_SIZE",
        );
        override_bool(
            &mut self.discovery.seed_sources,
            "INVENTA_DISCOVERY_SEED_SOURCES",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), InventaError> {
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

        let d = &self.discovery;
        for (field, value) in [
            ("discovery.library_dir", &d.library_dir),
            ("discovery.scan_dir", &d.scan_dir),
            ("discovery.output_dir", &d.output_dir),
        ] {
            validate_dir_path(field, value)?;
        }

        // output_dir는 실행마다 삭제되므로 입력 디렉토리와 겹치면 안 됨
        let output = clean_path(&d.output_dir);
        for (field, value) in [
            ("discovery.scan_dir", &d.scan_dir),
            ("discovery.library_dir", &d.library_dir),
        ] {
            let input = clean_path(value);
            if input.starts_with(&output) || output.starts_with(&input) {
                return Err(ConfigError::InvalidValue {
                    field: "discovery.output_dir".to_owned(),
                    reason: format!("'{}' overlaps {field} '{value}'", d.output_dir),
                }
                .into());
            }
        }

        for (field, value) in [
            ("discovery.rules_file", &d.rules_file),
            ("discovery.exclusions_file", &d.exclusions_file),
            ("discovery.signatures_file", &d.signatures_file),
        ] {
            validate_file_name(field, value)?;
        }

        if d.scan_extension.is_empty()
            || d.scan_extension.starts_with('.')
            || d.scan_extension.contains(['/', '\\'])
        {
            return Err(ConfigError::InvalidValue {
                field: "discovery.scan_extension".to_owned(),
                reason: "must be a bare extension such as 'scan'".to_owned(),
            }
            .into());
        }

        if d.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                field: "discovery.workers".to_owned(),
                reason: format!("must be 0 (auto) or 1-{MAX_WORKERS}"),
            }
            .into());
        }

        if d.max_scan_file_size == 0 || d.max_scan_file_size > MAX_SCAN_FILE_SIZE_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "discovery.max_scan_file_size".to_owned(),
                reason: format!("must be 1-{MAX_SCAN_FILE_SIZE_LIMIT}"),
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
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 소프트웨어 탐지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 탐지 라이브러리 디렉토리
    pub library_dir: String,
    /// 탐지 규칙 파일명 (library_dir 기준)
    pub rules_file: String,
    /// 버전 제외 규칙 파일명 (library_dir 기준)
    pub exclusions_file: String,
    /// 시그니처 파일명 (library_dir 기준)
    pub signatures_file: String,
    /// 스캔 파일 루트 디렉토리 (재귀 탐색)
    pub scan_dir: String,
    /// 스캔 파일 확장자 (점 제외)
    pub scan_extension: String,
    /// 결과 출력 디렉토리 (실행마다 재생성)
    pub output_dir: String,
    /// 워커 수 (0이면 가용 병렬성의 절반, 최소 1)
    pub workers: usize,
    /// 스캔 파일 최대 크기 (바이트)
    pub max_scan_file_size: u64,
    /// 이전 실행의 aggregate 소스 파일로 SourceCatalog를 미리 채울지 여부
    pub seed_sources: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            library_dir: "library".to_owned(),
            rules_file: "DiscoveryRules.txt".to_owned(),
            exclusions_file: "DiscoveryVERs.txt".to_owned(),
            signatures_file: "DiscoverySignatures.txt".to_owned(),
            scan_dir: "scans".to_owned(),
            scan_extension: "scan".to_owned(),
            output_dir: "results".to_owned(),
            workers: 0,
            max_scan_file_size: 256 * 1024 * 1024, // 256 MB
            seed_sources: false,
        }
    }
}

fn validate_dir_path(field: &str, value: &str) -> Result<(), InventaError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into());
    }

    // Path::components()로 ParentDir 컴포넌트 검출
    if Path::new(value)
        .components()
        .any(|c| c == std::path::Component::ParentDir)
    {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("'{value}' contains path traversal pattern '..'"),
        }
        .into());
    }

    if value.len() > MAX_PATH_LEN {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("path exceeds maximum length {MAX_PATH_LEN}"),
        }
        .into());
    }

    Ok(())
}

/// `.` 구성요소를 제거한 경로 (어휘적 비교용)
fn clean_path(value: &str) -> std::path::PathBuf {
    Path::new(value)
        .components()
        .filter(|c| *c != std::path::Component::CurDir)
        .collect()
}

fn validate_file_name(field: &str, value: &str) -> Result<(), InventaError> {
    if value.is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("'{value}' must be a plain file name"),
        }
        .into());
    }
    Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = InventaConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.discovery.rules_file, "DiscoveryRules.txt");
        assert_eq!(config.discovery.scan_extension, "scan");
        assert_eq!(config.discovery.workers, 0);
        assert!(!config.discovery.seed_sources);
    }

    #[test]
    fn default_config_passes_validation() {
        InventaConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = InventaConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.discovery.output_dir, "results");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[discovery]
scan_dir = "/srv/scans"
workers = 8
"#;
        let config = InventaConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.discovery.scan_dir, "/srv/scans");
        assert_eq!(config.discovery.workers, 8);
        assert_eq!(config.discovery.library_dir, "library");
    }

    #[test]
    fn from_str_invalid_toml_fails() {
        let err = InventaConfig::parse("[discovery\nworkers = ").unwrap_err();
        assert!(matches!(
            err,
            InventaError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = InventaConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = InventaConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_traversal() {
        let mut config = InventaConfig::default();
        config.discovery.scan_dir = "/srv/../etc".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_output_dir() {
        let mut config = InventaConfig::default();
        config.discovery.output_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_output_dir_overlapping_inputs() {
        let mut config = InventaConfig::default();
        config.discovery.output_dir = "./scans".to_owned();
        assert!(config.validate().is_err(), "output equal to scan_dir");

        let mut config = InventaConfig::default();
        config.discovery.library_dir = "/srv/inventa/library".to_owned();
        config.discovery.output_dir = "/srv/inventa".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("discovery.output_dir"));

        let mut config = InventaConfig::default();
        config.discovery.output_dir = "scans/results".to_owned();
        assert!(config.validate().is_err(), "output inside scan_dir");
    }

    #[test]
    fn validate_rejects_nested_rules_file() {
        let mut config = InventaConfig::default();
        config.discovery.rules_file = "sub/rules.txt".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_dotted_extension() {
        let mut config = InventaConfig::default();
        config.discovery.scan_extension = ".scan".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_too_many_workers() {
        let mut config = InventaConfig::default();
        config.discovery.workers = MAX_WORKERS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_scan_file_size() {
        let mut config = InventaConfig::default();
        config.discovery.max_scan_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = InventaConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = InventaConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.discovery.scan_dir, config.discovery.scan_dir);
        assert_eq!(parsed.general.log_format, config.general.log_format);
    }

    #[tokio::test]
    async fn from_file_missing_reports_not_found() {
        let err = InventaConfig::from_file("/nonexistent/inventa.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventaError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
