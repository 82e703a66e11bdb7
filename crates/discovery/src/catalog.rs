//! 전역 소스 카탈로그
//!
//! 모든 스캔에서 읽은 소스를 카탈로그 키로 중복 제거합니다.
//! 먼저 등록된 소스가 스캔 경로까지 포함하여 유지됩니다.
//! 검사와 삽입은 하나의 잠금 구간에서 원자적으로 수행됩니다.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{Source, SourceKey, SourceType};

/// 전역 소스 카탈로그
#[derive(Debug, Default)]
pub struct SourceCatalog {
    sources: Mutex<HashMap<SourceKey, Source>>,
}

impl SourceCatalog {
    /// 빈 카탈로그를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 소스를 등록합니다.
    ///
    /// 같은 키가 없을 때만 복사본을 저장하고 `true`를 반환합니다.
    /// 호출자는 자신의 스캔별 소스를 그대로 유지합니다.
    pub fn register(&self, source: &Source) -> bool {
        let key = source.catalog_key();
        let mut sources = self.sources.lock();
        if sources.contains_key(&key) {
            return false;
        }
        sources.insert(key, source.clone());
        true
    }

    /// 등록된 고유 소스 수
    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    /// 카탈로그가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    /// 유형별 스냅샷을 키 순서로 반환합니다.
    pub fn snapshot(&self, source_type: SourceType) -> Vec<Source> {
        let sources = self.sources.lock();
        let mut entries: Vec<(&SourceKey, &Source)> = sources
            .iter()
            .filter(|(_, s)| s.source_type == source_type)
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, s)| s.clone()).collect()
    }
}
