//! 탐지 규칙과 규칙 인덱스
//!
//! [`RuleIndex`]는 로드 후 변경되지 않는 다중 키 조회 구조입니다.
//! 규칙 자체는 `Vec<Rule>` arena에 저장되며 `RuleId(n)`은 `n - 1` 위치를 가리킵니다.
//!
//! # 조회 키
//!
//! - `build_id` → 해당 빌드의 규칙 목록 (확정 판정에 필요한 규칙 수)
//! - `(source_type, key_upper)` → 후보 규칙
//! - `(source_type, key_upper, product_version)` → 미사용 소스 보고용 정확 일치

use std::collections::{HashMap, HashSet};

use crate::error::DiscoveryError;
use crate::pattern::{AttrSpec, CaseMode};
use crate::types::{BuildId, RuleId, Source, SourceType, VersionId};

/// 컴파일 전 규칙 정의 (라이브러리 한 라인)
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub version_id: i64,
    pub build_id: i64,
    pub source_type: SourceType,
    pub key: String,
    pub product_version: String,
    pub product_name: String,
    pub file_version: String,
    pub file_size: String,
    pub file_path: String,
}

/// 컴파일된 탐지 규칙
#[derive(Debug, Clone)]
pub struct Rule {
    /// 규칙 식별자 (로드 순서)
    pub id: RuleId,
    /// 탐지 대상 제품 버전
    pub version_id: VersionId,
    /// 탐지 대상 제품 빌드
    pub build_id: BuildId,
    /// 매칭 대상 소스 유형
    pub source_type: SourceType,
    /// 원본 키
    pub key_original: String,
    /// 대문자 키
    pub key_upper: String,
    /// 제품 버전 스펙 (대소문자 구분)
    pub product_version: AttrSpec,
    /// 제품 이름 스펙 (대소문자 무시)
    pub product_name: AttrSpec,
    /// 파일 버전 스펙 (대소문자 구분)
    pub file_version: AttrSpec,
    /// 파일 크기 스펙 (정확 일치만)
    pub file_size: AttrSpec,
    /// 파일 경로 스펙 (항상 패턴, 대소문자 무시)
    pub file_path: AttrSpec,
}

impl Rule {
    /// 규칙 정의를 컴파일합니다.
    pub fn compile(id: RuleId, def: RuleDef) -> Result<Self, DiscoveryError> {
        Ok(Self {
            id,
            version_id: VersionId(def.version_id),
            build_id: BuildId(def.build_id),
            source_type: def.source_type,
            key_upper: def.key.to_uppercase(),
            key_original: def.key,
            product_version: AttrSpec::parse(&def.product_version, CaseMode::Sensitive)?,
            product_name: AttrSpec::parse(&def.product_name, CaseMode::Insensitive)?,
            file_version: AttrSpec::parse(&def.file_version, CaseMode::Sensitive)?,
            file_size: AttrSpec::literal(&def.file_size),
            file_path: AttrSpec::pattern(&def.file_path, CaseMode::Insensitive)?,
        })
    }

    /// 규칙이 소스의 모든 속성을 만족하는지 확인합니다.
    ///
    /// 유형과 키는 인덱스 조회에서 이미 일치한 것으로 간주합니다.
    /// 검사 순서: 제품 버전, 제품 이름, 파일 버전, 파일 크기, 파일 경로.
    pub fn accepts(&self, source: &Source) -> bool {
        self.product_version.matches(&source.product_version)
            && self.product_name.matches(&source.product_name)
            && self.file_version.matches(&source.file_version)
            && self.file_size.matches(&source.file_size)
            && self.file_path.matches(&source.file_path)
    }
}

/// 규칙 다중 키 인덱스
#[derive(Debug, Default)]
pub struct RuleIndex {
    rules: Vec<Rule>,
    by_build: HashMap<BuildId, Vec<RuleId>>,
    by_key: HashMap<(SourceType, String), Vec<RuleId>>,
    by_version: HashSet<(SourceType, String, String)>,
}

impl RuleIndex {
    /// 빈 인덱스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙 정의를 컴파일하여 추가합니다. 식별자는 1부터 순서대로 부여됩니다.
    pub fn push(&mut self, def: RuleDef) -> Result<RuleId, DiscoveryError> {
        let next = u32::try_from(self.rules.len() + 1).map_err(|_| DiscoveryError::Pattern {
            pattern: def.key.clone(),
            reason: "too many rules".to_owned(),
        })?;
        let id = RuleId(next);
        let rule = Rule::compile(id, def)?;

        self.by_build.entry(rule.build_id).or_default().push(id);
        self.by_key
            .entry((rule.source_type, rule.key_upper.clone()))
            .or_default()
            .push(id);
        self.by_version.insert((
            rule.source_type,
            rule.key_upper.clone(),
            rule.product_version.raw().to_owned(),
        ));
        self.rules.push(rule);
        Ok(id)
    }

    /// 식별자로 규칙을 조회합니다.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|idx| self.rules.get(idx))
    }

    /// 빌드에 속한 규칙 식별자 목록 (로드 순서)
    ///
    /// 목록의 길이가 빌드를 확정하는 데 필요한 규칙 수입니다.
    pub fn by_build(&self, build: BuildId) -> &[RuleId] {
        self.by_build.get(&build).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(source_type, key_upper)`가 일치하는 후보 규칙 (로드 순서)
    pub fn candidates<'a>(
        &'a self,
        source_type: SourceType,
        key_upper: &str,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.by_key
            .get(&(source_type, key_upper.to_owned()))
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(*id))
    }

    /// `(source_type, key_upper, product_version)` 정확 일치 규칙 존재 여부
    pub fn has_exact_version(
        &self,
        source_type: SourceType,
        key_upper: &str,
        product_version: &str,
    ) -> bool {
        self.by_version.contains(&(
            source_type,
            key_upper.to_owned(),
            product_version.to_owned(),
        ))
    }

    /// 소스가 어떤 규칙에서든 사용될 수 있는지 확인합니다.
    ///
    /// 정확한 버전 일치, 또는 같은 유형/키의 규칙 중 버전 스펙이 비어 있거나
    /// 패턴으로 버전을 허용하는 규칙이 있으면 사용된 것으로 봅니다.
    pub fn is_source_used(&self, source: &Source) -> bool {
        if self.has_exact_version(source.source_type, &source.key_upper, &source.product_version) {
            return true;
        }
        self.candidates(source.source_type, &source.key_upper)
            .any(|rule| match &rule.product_version {
                AttrSpec::Any => true,
                AttrSpec::Pattern(glob) => glob.is_match(&source.product_version),
                AttrSpec::Exact { .. } => false,
            })
    }

    /// 전체 규칙 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 규칙이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 서로 다른 빌드 수
    pub fn build_count(&self) -> usize {
        self.by_build.len()
    }

    /// 로드 순서대로 규칙을 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}
