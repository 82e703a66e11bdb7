//! 스캔별 매칭 엔진
//!
//! [`ScanMatcher`]는 공유 읽기 전용 인덱스와 한 스캔의 소스로 해당 스캔의
//! 최종 탐지 집합을 만듭니다. 단일 워커가 독점 소유하므로 잠금이 없습니다.
//!
//! # 처리 단계
//!
//! 1. **매칭**: 소스마다 `(유형, 대문자 키)` 후보 규칙을 필터링하여
//!    `(소스 경로, 버전, 빌드)` 탐지에 매치를 추가
//! 2. **결합**: 경로 있는 탐지에 같은 버전/빌드의 경로 없는 매치와
//!    하위 경로 탐지의 매치를 병합
//! 3. **정리**: 빌드의 전체 규칙 수를 채우지 못한 탐지 제거
//! 4. **버전 제외**: 같은 경로에 후속 버전이 있는 탐지 제거

use std::collections::BTreeMap;

use inventa_core::metrics as m;
use serde::Serialize;
use tracing::{debug, warn};

use crate::exclusion::ExclusionGraph;
use crate::rules::RuleIndex;
use crate::types::{BuildId, RuleId, Source, SourceId, VersionId};

/// 스캔 내 탐지 식별자
///
/// 정렬 순서는 경로, 버전, 빌드 순이며 빈 경로가 가장 먼저 옵니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DetectionKey {
    /// 탐지 경로. 빈 값은 경로 없는 증거
    pub path: String,
    pub version_id: VersionId,
    pub build_id: BuildId,
}

impl DetectionKey {
    pub fn new(path: impl Into<String>, version_id: VersionId, build_id: BuildId) -> Self {
        Self {
            path: path.into(),
            version_id,
            build_id,
        }
    }
}

/// 규칙과 소스의 매치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Match {
    pub rule: RuleId,
    pub source: SourceId,
}

/// 확정된 탐지
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub key: DetectionKey,
    /// 규칙 식별자 순서의 매치 목록
    pub matches: Vec<Match>,
}

/// 탐지 집합
///
/// 정렬된 키 인덱스와 가변 매치 저장소를 분리합니다.
/// 탐지마다 규칙당 하나의 매치만 유지하며 먼저 삽입된 매치가 남습니다.
#[derive(Debug, Default, Clone)]
pub struct DetectionSet {
    index: BTreeMap<DetectionKey, usize>,
    matches: Vec<BTreeMap<RuleId, SourceId>>,
}

impl DetectionSet {
    /// 빈 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 매치를 추가합니다. 탐지가 없으면 생성합니다.
    ///
    /// 같은 규칙의 매치가 이미 있으면 무시하고 `false`를 반환합니다.
    pub fn insert(&mut self, key: DetectionKey, rule: RuleId, source: SourceId) -> bool {
        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let slot = self.matches.len();
                self.matches.push(BTreeMap::new());
                self.index.insert(key, slot);
                slot
            }
        };
        let set = &mut self.matches[slot];
        if set.contains_key(&rule) {
            return false;
        }
        set.insert(rule, source);
        true
    }

    /// 탐지 수
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// 탐지가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 키로 탐지의 매치를 조회합니다.
    pub fn get(&self, key: &DetectionKey) -> Option<&BTreeMap<RuleId, SourceId>> {
        self.index.get(key).map(|slot| &self.matches[*slot])
    }

    /// 키 순서로 탐지를 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&DetectionKey, &BTreeMap<RuleId, SourceId>)> {
        self.index
            .iter()
            .map(|(key, slot)| (key, &self.matches[*slot]))
    }

    /// 경로에 해당 버전의 탐지가 있는지 확인합니다 (빌드 무관).
    pub fn has_version_at(&self, path: &str, version_id: VersionId) -> bool {
        let start = DetectionKey::new(path, version_id, BuildId(i64::MIN));
        self.index
            .range(start..)
            .next()
            .is_some_and(|(key, _)| key.path == path && key.version_id == version_id)
    }

    /// 경로 없는 매치와 하위 경로 매치를 경로 있는 탐지에 병합합니다.
    ///
    /// 모든 병합은 결합 전 매치 집합을 기준으로 하므로 결과가 처리 순서에
    /// 의존하지 않습니다. 병합 순서는 자신, 경로 없는 탐지, 하위 경로 순입니다.
    pub fn combine(&mut self) {
        let keys: Vec<(DetectionKey, usize)> = self
            .index
            .iter()
            .map(|(key, slot)| (key.clone(), *slot))
            .collect();
        let original = self.matches.clone();

        for (pos, (key, slot)) in keys.iter().enumerate() {
            if key.path.is_empty() {
                continue;
            }
            let target = &mut self.matches[*slot];

            let non_path = DetectionKey::new("", key.version_id, key.build_id);
            if let Some(np_slot) = self.index.get(&non_path) {
                merge_into(target, &original[*np_slot]);
            }

            for (sub_key, sub_slot) in &keys[pos + 1..] {
                if sub_key.path == key.path {
                    continue;
                }
                if !sub_key.path.starts_with(key.path.as_str()) {
                    break;
                }
                if sub_key.build_id == key.build_id {
                    merge_into(target, &original[*sub_slot]);
                }
            }
        }
    }

    /// 빌드의 전체 규칙 수와 매치 수가 다른 탐지를 제거합니다.
    ///
    /// 제거된 탐지 수를 반환합니다. 다시 호출해도 결과가 같습니다.
    pub fn prune(&mut self, rules: &RuleIndex) -> usize {
        let before = self.index.len();
        let matches = &self.matches;
        self.index
            .retain(|key, slot| matches[*slot].len() == rules.by_build(key.build_id).len());
        before - self.index.len()
    }

    /// 탐지를 제거합니다.
    pub fn remove(&mut self, key: &DetectionKey) -> bool {
        self.index.remove(key).is_some()
    }

    /// 확정 탐지 목록으로 변환합니다.
    pub fn into_detections(self) -> Vec<Detection> {
        let Self { index, mut matches } = self;
        index
            .into_iter()
            .map(|(key, slot)| Detection {
                key,
                matches: std::mem::take(&mut matches[slot])
                    .into_iter()
                    .map(|(rule, source)| Match { rule, source })
                    .collect(),
            })
            .collect()
    }
}

fn merge_into(target: &mut BTreeMap<RuleId, SourceId>, from: &BTreeMap<RuleId, SourceId>) {
    for (rule, source) in from {
        target.entry(*rule).or_insert(*source);
    }
}

/// 버전 제외 단계 통계
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionStats {
    /// 제외된 탐지 수
    pub excluded: usize,
    /// 순환으로 판정을 보류한 탐지 수
    pub cycles: usize,
}

/// 한 스캔의 매칭 결과
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// 스캔의 소스 arena (`SourceId` 인덱스)
    pub sources: Vec<Source>,
    /// 확정된 탐지 (키 순서)
    pub detections: Vec<Detection>,
    /// 제외 단계 통계
    pub exclusion: ExclusionStats,
}

impl ScanResult {
    /// 매치의 소스를 조회합니다.
    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(id.0)
    }
}

/// 스캔별 매칭 엔진
pub struct ScanMatcher<'a> {
    rules: &'a RuleIndex,
    exclusions: &'a ExclusionGraph,
    sources: Vec<Source>,
    detections: DetectionSet,
}

impl<'a> ScanMatcher<'a> {
    /// 공유 인덱스와 스캔 소스로 매처를 생성합니다.
    pub fn new(rules: &'a RuleIndex, exclusions: &'a ExclusionGraph, sources: Vec<Source>) -> Self {
        Self {
            rules,
            exclusions,
            sources,
            detections: DetectionSet::new(),
        }
    }

    /// 모든 소스를 후보 규칙과 매칭합니다.
    pub fn match_sources(&mut self) {
        for (idx, source) in self.sources.iter().enumerate() {
            for rule in self.rules.candidates(source.source_type, &source.key_upper) {
                if !rule.accepts(source) {
                    continue;
                }
                let key = DetectionKey::new(&source.file_path, rule.version_id, rule.build_id);
                self.detections.insert(key, rule.id, SourceId(idx));
            }
        }
    }

    /// 경로 없는 매치와 하위 경로 매치를 결합합니다.
    pub fn combine(&mut self) {
        self.detections.combine();
    }

    /// 불완전한 탐지를 제거합니다.
    pub fn prune(&mut self) -> usize {
        self.detections.prune(self.rules)
    }

    /// 같은 경로에 후속 버전이 탐지된 탐지를 제거합니다.
    ///
    /// 판정은 제외 전 집합을 기준으로 합니다. 순환을 만나면 경고를 남기고
    /// 해당 탐지를 유지합니다.
    pub fn resolve_exclusions(&mut self) -> ExclusionStats {
        let mut stats = ExclusionStats::default();
        if self.exclusions.is_empty() {
            return stats;
        }

        let mut excluded = Vec::new();
        for (key, _) in self.detections.iter() {
            let present = |v: VersionId| self.detections.has_version_at(&key.path, v);
            match self.exclusions.is_excluded(key.version_id, present) {
                Ok(true) => excluded.push(key.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        path = %key.path,
                        version_id = %key.version_id,
                        error = %e,
                        "exclusion cycle, keeping detection"
                    );
                    metrics::counter!(m::DISCOVERY_EXCLUSION_CYCLES_TOTAL).increment(1);
                    stats.cycles += 1;
                }
            }
        }

        for key in &excluded {
            self.detections.remove(key);
        }
        stats.excluded = excluded.len();
        stats
    }

    /// 매칭, 결합, 정리, 버전 제외를 순서대로 수행합니다.
    pub fn run(mut self) -> ScanResult {
        self.match_sources();
        let candidates = self.detections.len();
        self.combine();
        let pruned = self.prune();
        let exclusion = self.resolve_exclusions();

        debug!(
            sources = self.sources.len(),
            candidates,
            pruned,
            excluded = exclusion.excluded,
            confirmed = self.detections.len(),
            "scan matched"
        );

        ScanResult {
            sources: self.sources,
            detections: self.detections.into_detections(),
            exclusion,
        }
    }
}
