//! 스캔 파일 탐색 및 파싱
//!
//! 스캔 파일은 섹션으로 나뉜 탭 구분 텍스트입니다.
//!
//! ```text
//! <SourceName=AddRemoves>
//! <Fields=DisplayName  DisplayVersion  Publisher  InstallLocation  UninstallString  SystemComponent>
//! Acme Tool  1.0  Acme  C:\Acme\  ...  0
//! <SourceName=Files>
//! <Fields=FilePath  FileName  ProductVersion  CompanyName  ProductName  FileDescription  FileVersion  FileSize>
//! <SourceName=PkgInsts>
//! <Fields=Name  Version  Vendor>
//! ```
//!
//! 필드 수가 맞지 않는 라인은 경고 후 건너뜁니다. 알려진 섹션 이전의 라인과
//! 헤더 형태의 라인(`<SourceName=`, `<Fields=`, 탭이 없는 `<...>`)은 무시합니다.
//! `<`로 시작하더라도 탭을 포함한 라인은 데이터로 파싱합니다.

use std::path::{Path, PathBuf};

use inventa_core::metrics as m;
use tracing::{debug, warn};

use crate::error::DiscoveryError;
use crate::types::{Source, SourceType};

/// 추가/제거 섹션 필드 수
pub const ADD_REMOVE_FIELD_COUNT: usize = 6;
/// 파일 섹션 필드 수
pub const FILE_FIELD_COUNT: usize = 8;
/// 패키지 설치 섹션 필드 수
pub const PKG_INST_FIELD_COUNT: usize = 3;

const ADD_REMOVE_HEADER: &str = "<SourceName=AddRemoves>";
const FILE_HEADER: &str = "<SourceName=Files>";
const PKG_INST_HEADER: &str = "<SourceName=PkgInsts>";

/// 파싱된 스캔
#[derive(Debug, Default, Clone)]
pub struct ParsedScan {
    /// 파일 순서의 소스 목록
    pub sources: Vec<Source>,
    /// 건너뛴 잘못된 라인 수
    pub malformed: usize,
}

impl ParsedScan {
    /// 유형별 소스 수
    pub fn count(&self, source_type: SourceType) -> usize {
        self.sources
            .iter()
            .filter(|s| s.source_type == source_type)
            .count()
    }
}

/// 섹션 헤더 라인이면 해당 소스 유형을 반환합니다.
fn section_of(line: &str) -> Option<SourceType> {
    if line.starts_with(ADD_REMOVE_HEADER) {
        Some(SourceType::AddRemove)
    } else if line.starts_with(FILE_HEADER) {
        Some(SourceType::File)
    } else if line.starts_with(PKG_INST_HEADER) {
        Some(SourceType::PkgInst)
    } else {
        None
    }
}

/// 데이터가 아닌 헤더 형태의 라인인지 확인합니다.
fn is_header_line(line: &str) -> bool {
    line.starts_with("<SourceName=")
        || line.starts_with("<Fields=")
        || (line.starts_with('<') && line.ends_with('>') && !line.contains('\t'))
}

/// 섹션의 한 데이터 라인을 소스로 파싱합니다.
pub fn parse_scan_line(section: SourceType, line: &str) -> Result<Source, String> {
    let f: Vec<&str> = line.split('\t').collect();
    let expected = match section {
        SourceType::AddRemove => ADD_REMOVE_FIELD_COUNT,
        SourceType::File => FILE_FIELD_COUNT,
        SourceType::PkgInst => PKG_INST_FIELD_COUNT,
    };
    if f.len() != expected {
        return Err(format!(
            "{section} line: expected {expected} fields, found {}",
            f.len()
        ));
    }
    Ok(match section {
        SourceType::AddRemove => Source::add_remove(f[0], f[1], f[2]),
        SourceType::File => Source::file(f[0], f[1], f[2], f[3], f[4], f[5], f[6], f[7]),
        SourceType::PkgInst => Source::pkg_inst(f[0], f[1], f[2]),
    })
}

/// 스캔 파일 내용을 파싱합니다. 모든 소스에 `scan_path`가 기록됩니다.
pub fn parse_scan(scan_path: &str, content: &str) -> ParsedScan {
    let mut parsed = ParsedScan::default();
    let mut section: Option<SourceType> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if let Some(next) = section_of(line) {
            section = Some(next);
            continue;
        }
        if is_header_line(line) || line.trim().is_empty() {
            continue;
        }
        let Some(current) = section else {
            continue;
        };

        match parse_scan_line(current, line) {
            Ok(source) => parsed.sources.push(source.with_scan_path(scan_path)),
            Err(reason) => {
                warn!(scan = %scan_path, line = idx + 1, %reason, "skipping malformed scan line");
                parsed.malformed += 1;
            }
        }
    }

    if parsed.malformed > 0 {
        metrics::counter!(m::DISCOVERY_MALFORMED_LINES_TOTAL).increment(parsed.malformed as u64);
    }
    for ty in SourceType::ALL {
        let n = parsed.count(ty);
        if n > 0 {
            metrics::counter!(m::DISCOVERY_SOURCES_READ_TOTAL, m::LABEL_SOURCE_TYPE => ty.as_str())
                .increment(n as u64);
        }
    }
    parsed
}

/// 스캔 파일을 읽고 파싱합니다.
///
/// 블로킹 I/O를 수행합니다.
pub fn load_scan(path: &Path, max_size: u64) -> Result<ParsedScan, DiscoveryError> {
    let display = path.display().to_string();
    let metadata = std::fs::metadata(path).map_err(|e| DiscoveryError::ScanRead {
        path: display.clone(),
        source: e,
    })?;
    if metadata.len() > max_size {
        return Err(DiscoveryError::FileTooBig {
            path: display,
            size: metadata.len(),
            max: max_size,
        });
    }
    let bytes = std::fs::read(path).map_err(|e| DiscoveryError::ScanRead {
        path: display.clone(),
        source: e,
    })?;
    Ok(parse_scan(&display, &String::from_utf8_lossy(&bytes)))
}

/// 디렉토리를 재귀 탐색하여 확장자가 일치하는 스캔 파일을 정렬된 순서로 반환합니다.
///
/// 루트 디렉토리를 읽을 수 없으면 실패합니다. 하위 디렉토리 오류는 경고 후 건너뜁니다.
/// 심볼릭 링크는 따라가지 않습니다.
pub fn find_scans(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut is_root = true;

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if is_root => {
                return Err(DiscoveryError::ScanRead {
                    path: dir.display().to_string(),
                    source: e,
                });
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        is_root = false;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file()
                && path.extension().is_some_and(|ext| ext == extension)
            {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(root = %root.display(), count = found.len(), "scan files found");
    Ok(found)
}
