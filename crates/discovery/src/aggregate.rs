//! 전역 탐지 결과 집계기
//!
//! 확정된 탐지를 `(build_id, 대문자 경로)` 키로 누적합니다.
//! 빌드가 버전을 유일하게 결정하므로 버전은 키에 포함하지 않습니다.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::types::{BuildId, VersionId};

/// 스캔 전체에 걸친 탐지 집계 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateDetection {
    /// 처음 확정된 탐지의 경로 (원래 대소문자)
    pub path: String,
    pub version_id: VersionId,
    pub build_id: BuildId,
    /// 확정된 스캔 수
    pub count: u64,
    /// 처음 확정한 스캔 경로 (덮어쓰지 않음)
    pub scan_path: String,
}

/// 전역 탐지 결과 집계기
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Mutex<HashMap<(BuildId, String), AggregateDetection>>,
}

impl ResultAggregator {
    /// 빈 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 확정된 탐지 하나를 기록합니다.
    ///
    /// 새 키면 count=1로 삽입하고, 기존 키면 count만 증가시킵니다.
    pub fn record_confirmed(
        &self,
        path: &str,
        version_id: VersionId,
        build_id: BuildId,
        scan_path: &str,
    ) {
        let key = (build_id, path.to_uppercase());
        let mut results = self.results.lock();
        results
            .entry(key)
            .and_modify(|row| row.count += 1)
            .or_insert_with(|| AggregateDetection {
                path: path.to_owned(),
                version_id,
                build_id,
                count: 1,
                scan_path: scan_path.to_owned(),
            });
    }

    /// 집계 행 수
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    /// 집계가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// `(build_id, 대문자 경로)` 순서로 정렬된 스냅샷
    pub fn snapshot(&self) -> Vec<AggregateDetection> {
        let results = self.results.lock();
        let mut entries: Vec<_> = results.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, row)| row.clone()).collect()
    }
}
