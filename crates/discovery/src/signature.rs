//! 제품 시그니처 카탈로그 (보고 전용 메타데이터)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::VersionId;

/// 시그니처 레코드 필드 수
pub const SIGNATURE_FIELD_COUNT: usize = 15;

/// 제품 버전 표시 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub publisher_id: i64,
    pub publisher_name: String,
    pub web_page: String,
    pub product_id: i64,
    pub product_name: String,
    pub licensable: String,
    pub category: String,
    pub version_id: VersionId,
    pub unique_version: String,
    pub build: String,
    pub major: String,
    pub minor: String,
    pub edition: String,
    pub variation: String,
    pub license_version: String,
}

impl Signature {
    /// 상세 결과 출력용으로 15개 필드를 라이브러리 순서대로 탭 연결합니다.
    pub fn to_tsv(&self) -> String {
        [
            self.publisher_id.to_string(),
            self.publisher_name.clone(),
            self.web_page.clone(),
            self.product_id.to_string(),
            self.product_name.clone(),
            self.licensable.clone(),
            self.category.clone(),
            self.version_id.to_string(),
            self.unique_version.clone(),
            self.build.clone(),
            self.major.clone(),
            self.minor.clone(),
            self.edition.clone(),
            self.variation.clone(),
            self.license_version.clone(),
        ]
        .join("\t")
    }
}

/// `VersionId` → 시그니처 조회 테이블
#[derive(Debug, Default, Clone)]
pub struct SignatureCatalog {
    by_version: HashMap<VersionId, Signature>,
}

impl SignatureCatalog {
    /// 빈 카탈로그를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 시그니처를 추가합니다. 같은 버전이 이미 있으면 기존 값을 유지하고 `false`를 반환합니다.
    pub fn insert(&mut self, signature: Signature) -> bool {
        match self.by_version.entry(signature.version_id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(signature);
                true
            }
        }
    }

    /// 버전의 시그니처를 조회합니다.
    pub fn get(&self, version: VersionId) -> Option<&Signature> {
        self.by_version.get(&version)
    }

    /// 시그니처 수
    pub fn len(&self) -> usize {
        self.by_version.len()
    }

    /// 시그니처가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.by_version.is_empty()
    }
}
