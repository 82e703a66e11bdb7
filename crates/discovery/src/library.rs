//! 탐지 라이브러리 로더
//!
//! 규칙, 버전 제외, 시그니처 파일은 모두 탭 구분 텍스트이며 한 라인이 한 레코드입니다.
//! 빈 라인은 무시하고, 그 외 파싱할 수 없는 라인은 파일 경로와 라인 번호를 담은
//! [`DiscoveryError::InvalidRecord`]로 즉시 실패합니다.
//!
//! 모든 함수는 블로킹 I/O를 수행하므로 비동기 컨텍스트에서는
//! `tokio::task::spawn_blocking`으로 감싸세요.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::DiscoveryError;
use crate::exclusion::ExclusionGraph;
use crate::rules::{RuleDef, RuleIndex};
use crate::signature::{SIGNATURE_FIELD_COUNT, Signature, SignatureCatalog};
use crate::types::{SourceType, VersionId};

/// 규칙 레코드 필드 수
pub const RULE_FIELD_COUNT: usize = 9;

/// 로드된 탐지 라이브러리
#[derive(Debug, Default)]
pub struct Library {
    pub rules: RuleIndex,
    pub exclusions: ExclusionGraph,
    pub signatures: SignatureCatalog,
}

/// 라이브러리 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub rules: usize,
    pub builds: usize,
    pub exclusion_edges: usize,
    pub signatures: usize,
}

impl Library {
    /// 설정의 라이브러리 디렉토리에서 세 파일을 모두 로드합니다.
    pub fn load(config: &EngineConfig) -> Result<Self, DiscoveryError> {
        Self::load_files(
            &config.rules_path(),
            &config.exclusions_path(),
            &config.signatures_path(),
        )
    }

    /// 파일 경로를 지정하여 라이브러리를 로드합니다.
    pub fn load_files(
        rules_path: &Path,
        exclusions_path: &Path,
        signatures_path: &Path,
    ) -> Result<Self, DiscoveryError> {
        let rules = parse_rules(&rules_path.display().to_string(), &read_library_file(rules_path)?)?;
        let exclusions = parse_exclusions(
            &exclusions_path.display().to_string(),
            &read_library_file(exclusions_path)?,
        )?;
        let signatures = parse_signatures(
            &signatures_path.display().to_string(),
            &read_library_file(signatures_path)?,
        )?;

        let library = Self {
            rules,
            exclusions,
            signatures,
        };
        let stats = library.stats();
        info!(
            rules = stats.rules,
            builds = stats.builds,
            exclusion_edges = stats.exclusion_edges,
            signatures = stats.signatures,
            "discovery library loaded"
        );
        Ok(library)
    }

    /// 버전 제외 그래프에 순환이 없는지 확인합니다.
    ///
    /// # Errors
    ///
    /// 순환이 있으면 순환 경로를 로그에 남기고 `DiscoveryError::ExclusionCycle` 반환
    pub fn check_exclusion_cycles(&self) -> Result<(), DiscoveryError> {
        match self.exclusions.find_cycle() {
            Some(cycle) => {
                let path = cycle
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                warn!(cycle = %path, "exclusion cycle found");
                Err(DiscoveryError::ExclusionCycle { version: cycle[0] })
            }
            None => Ok(()),
        }
    }

    /// 라이브러리 요약을 반환합니다.
    pub fn stats(&self) -> LibraryStats {
        LibraryStats {
            rules: self.rules.len(),
            builds: self.rules.build_count(),
            exclusion_edges: self.exclusions.edge_count(),
            signatures: self.signatures.len(),
        }
    }
}

/// 라이브러리 파일을 읽습니다. 잘못된 UTF-8 바이트는 대체 문자로 바뀝니다.
fn read_library_file(path: &Path) -> Result<String, DiscoveryError> {
    let bytes = std::fs::read(path).map_err(|e| DiscoveryError::LibraryLoad {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 비어 있지 않은 라인을 1부터 시작하는 라인 번호와 함께 순회합니다.
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn parse_int(field: &str, value: &str) -> Result<i64, String> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid {field} '{value}'"))
}

/// 규칙 한 라인을 파싱합니다.
///
/// 마지막 필드(파일 경로)는 라인의 나머지 전체입니다.
pub fn parse_rule_line(line: &str) -> Result<RuleDef, String> {
    let fields: Vec<&str> = line.splitn(RULE_FIELD_COUNT, '\t').collect();
    if fields.len() != RULE_FIELD_COUNT {
        return Err(format!(
            "expected {RULE_FIELD_COUNT} fields, found {}",
            fields.len()
        ));
    }
    let source_type = SourceType::from_code(fields[2])
        .ok_or_else(|| format!("invalid sourceType '{}'", fields[2]))?;
    Ok(RuleDef {
        version_id: parse_int("versionId", fields[0])?,
        build_id: parse_int("buildId", fields[1])?,
        source_type,
        key: fields[3].to_owned(),
        product_version: fields[4].to_owned(),
        product_name: fields[5].to_owned(),
        file_version: fields[6].to_owned(),
        file_size: fields[7].to_owned(),
        file_path: fields[8].to_owned(),
    })
}

/// 규칙 파일 내용을 파싱하여 인덱스를 만듭니다. 규칙 식별자는 라인 순서로 부여됩니다.
pub fn parse_rules(path: &str, content: &str) -> Result<RuleIndex, DiscoveryError> {
    let mut index = RuleIndex::new();
    for (line_no, line) in records(content) {
        let invalid = |reason: String| DiscoveryError::InvalidRecord {
            path: path.to_owned(),
            line: line_no,
            reason,
        };
        let def = parse_rule_line(line).map_err(invalid)?;
        index.push(def).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(index)
}

/// 버전 제외 한 라인을 `(excluded, superseding)`으로 파싱합니다.
pub fn parse_exclusion_line(line: &str) -> Result<(VersionId, VersionId), String> {
    let fields: Vec<&str> = line.splitn(3, '\t').collect();
    if fields.len() < 2 {
        return Err("expected at least 2 fields, found 1".to_owned());
    }
    Ok((
        VersionId(parse_int("excludedVersionId", fields[0])?),
        VersionId(parse_int("versionId", fields[1])?),
    ))
}

/// 버전 제외 파일 내용을 파싱합니다. 세 번째 이후 필드는 무시합니다.
pub fn parse_exclusions(path: &str, content: &str) -> Result<ExclusionGraph, DiscoveryError> {
    let mut graph = ExclusionGraph::new();
    for (line_no, line) in records(content) {
        let (excluded, superseding) =
            parse_exclusion_line(line).map_err(|reason| DiscoveryError::InvalidRecord {
                path: path.to_owned(),
                line: line_no,
                reason,
            })?;
        graph.add_edge(excluded, superseding);
    }
    Ok(graph)
}

/// 시그니처 한 라인을 파싱합니다.
pub fn parse_signature_line(line: &str) -> Result<Signature, String> {
    let f: Vec<&str> = line.split('\t').collect();
    if f.len() != SIGNATURE_FIELD_COUNT {
        return Err(format!(
            "expected {SIGNATURE_FIELD_COUNT} fields, found {}",
            f.len()
        ));
    }
    Ok(Signature {
        publisher_id: parse_int("publisherId", f[0])?,
        publisher_name: f[1].to_owned(),
        web_page: f[2].to_owned(),
        product_id: parse_int("productId", f[3])?,
        product_name: f[4].to_owned(),
        licensable: f[5].to_owned(),
        category: f[6].to_owned(),
        version_id: VersionId(parse_int("versionId", f[7])?),
        unique_version: f[8].to_owned(),
        build: f[9].to_owned(),
        major: f[10].to_owned(),
        minor: f[11].to_owned(),
        edition: f[12].to_owned(),
        variation: f[13].to_owned(),
        license_version: f[14].to_owned(),
    })
}

/// 시그니처 파일 내용을 파싱합니다. 같은 버전이 반복되면 첫 번째가 유지됩니다.
pub fn parse_signatures(path: &str, content: &str) -> Result<SignatureCatalog, DiscoveryError> {
    let mut catalog = SignatureCatalog::new();
    for (line_no, line) in records(content) {
        let signature = parse_signature_line(line).map_err(|reason| {
            DiscoveryError::InvalidRecord {
                path: path.to_owned(),
                line: line_no,
                reason,
            }
        })?;
        catalog.insert(signature);
    }
    Ok(catalog)
}
