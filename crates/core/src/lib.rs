//! Inventa 공통 크레이트
//!
//! 모든 Inventa 크레이트가 공유하는 에러 타입, 설정, 메트릭 이름을 정의합니다.
//!
//! - [`error`]: 최상위 에러 타입 (`InventaError`)과 도메인별 에러
//! - [`config`]: `inventa.toml` 설정 (`InventaConfig`)
//! - [`metrics`]: 메트릭 이름 상수와 설명 등록

pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, InventaError, LibraryError, ScanError};

// 설정
pub use config::{DiscoveryConfig, GeneralConfig, InventaConfig};
