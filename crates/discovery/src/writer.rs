//! 결과 파일 기록
//!
//! 출력 디렉토리는 실행마다 새로 만들어집니다. 스캔별 결과는 단일 기록 태스크가
//! [`ResultWriter`]로 쓰고, 집계 결과와 집계 소스는 모든 스캔이 끝난 뒤 기록합니다.
//!
//! # 출력 파일
//!
//! | 파일 | 내용 |
//! |------|------|
//! | `results.txt` | 스캔별 확정 탐지 |
//! | `results_verbose_{files,addremoves,pkginsts}.txt` | 매치별 시그니처 + 소스 (헤더 포함) |
//! | `results_aggregate.txt` | 스캔 전체 탐지 집계 |
//! | `aggregate_{files,addremoves,pkginsts}.txt` | 고유 소스 |
//! | `aggregate_{files,addremoves,pkginsts}_unused.txt` | 어떤 규칙도 사용하지 않는 고유 소스 |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use inventa_core::metrics as m;
use tracing::{debug, warn};

use crate::aggregate::AggregateDetection;
use crate::catalog::SourceCatalog;
use crate::error::DiscoveryError;
use crate::matcher::{Detection, ScanResult};
use crate::rules::RuleIndex;
use crate::signature::{Signature, SignatureCatalog};
use crate::types::{Source, SourceType};

/// 스캔별 결과 파일명
pub const RESULTS_FILE: &str = "results.txt";
/// 집계 결과 파일명
pub const AGGREGATE_RESULTS_FILE: &str = "results_aggregate.txt";

const SIGNATURE_HEADER: &str = "SourceScanPath\tPublisherID\tPublisherName\tWebPage\tProductID\t\
ProductName\tLicensable\tCategory\tVersionID\tUniqueVersion\tBuild\tMajor\tMinor\tEdition\t\
Variation\tLicenseVersion\tSourceType";

/// 유형별 상세 결과 파일명
pub fn verbose_file_name(source_type: SourceType) -> String {
    format!("results_verbose_{}.txt", source_type.plural())
}

/// 유형별 집계 소스 파일명
pub fn aggregate_sources_file_name(source_type: SourceType) -> String {
    format!("aggregate_{}.txt", source_type.plural())
}

/// 유형별 미사용 집계 소스 파일명
pub fn unused_sources_file_name(source_type: SourceType) -> String {
    format!("aggregate_{}_unused.txt", source_type.plural())
}

/// 상세 결과 헤더 행
pub fn verbose_header(source_type: SourceType) -> String {
    let tail = match source_type {
        SourceType::File => {
            "SourceManufacturer\tSourceFileName\tSourceFileDescription\tSourceProductName\tSourceProductVersion"
        }
        SourceType::AddRemove | SourceType::PkgInst => {
            "SourceManufacturer\tSourceSoftwareName\tSourceSoftwareVersion"
        }
    };
    format!("{SIGNATURE_HEADER}\t{tail}")
}

/// `results.txt` 한 행
pub fn result_line(detection: &Detection, scan_path: &str) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        detection.key.version_id, detection.key.build_id, detection.key.path, scan_path
    )
}

/// 상세 결과 한 행
pub fn verbose_line(scan_path: &str, signature: &Signature, source: &Source) -> String {
    let source_part = match source.source_type {
        SourceType::File => format!(
            "{}\t{}\t{}\t{}\t{}",
            source.company_name,
            source.key_original,
            source.file_description,
            source.product_name,
            source.product_version
        ),
        SourceType::AddRemove | SourceType::PkgInst => format!(
            "{}\t{}\t{}",
            source.company_name, source.key_original, source.product_version
        ),
    };
    format!(
        "{scan_path}\t{}\t{}\t{source_part}",
        signature.to_tsv(),
        source.source_type
    )
}

/// `results_aggregate.txt` 한 행
pub fn aggregate_line(row: &AggregateDetection) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        row.version_id, row.build_id, row.path, row.count, row.scan_path
    )
}

/// 집계 소스 파일 한 행
pub fn source_line(source: &Source) -> String {
    match source.source_type {
        SourceType::File => [
            source.key_original.as_str(),
            &source.product_version,
            &source.company_name,
            &source.product_name,
            &source.file_description,
            &source.file_version,
            &source.file_size,
            &source.file_path,
            &source.scan_path,
        ]
        .join("\t"),
        SourceType::AddRemove | SourceType::PkgInst => [
            source.key_original.as_str(),
            &source.product_version,
            &source.company_name,
            &source.scan_path,
        ]
        .join("\t"),
    }
}

/// 집계 소스 파일 한 행을 파싱합니다.
pub fn parse_source_line(source_type: SourceType, line: &str) -> Result<Source, String> {
    let f: Vec<&str> = line.split('\t').collect();
    let expected = match source_type {
        SourceType::File => 9,
        SourceType::AddRemove | SourceType::PkgInst => 4,
    };
    if f.len() != expected {
        return Err(format!("expected {expected} fields, found {}", f.len()));
    }
    Ok(match source_type {
        SourceType::File => {
            Source::file(f[7], f[0], f[1], f[2], f[3], f[4], f[5], f[6]).with_scan_path(f[8])
        }
        SourceType::AddRemove => Source::add_remove(f[0], f[1], f[2]).with_scan_path(f[3]),
        SourceType::PkgInst => Source::pkg_inst(f[0], f[1], f[2]).with_scan_path(f[3]),
    })
}

fn output_error(path: &Path, source: std::io::Error) -> DiscoveryError {
    DiscoveryError::Output {
        path: path.display().to_string(),
        source,
    }
}

/// 버퍼링된 출력 파일
struct OutputFile {
    path: PathBuf,
    out: BufWriter<File>,
}

impl OutputFile {
    fn create(path: PathBuf) -> Result<Self, DiscoveryError> {
        let file = File::create(&path).map_err(|e| output_error(&path, e))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    fn line(&mut self, line: &str) -> Result<(), DiscoveryError> {
        writeln!(self.out, "{line}").map_err(|e| output_error(&self.path, e))
    }

    fn flush(&mut self) -> Result<(), DiscoveryError> {
        self.out.flush().map_err(|e| output_error(&self.path, e))
    }
}

/// 출력 디렉토리를 비우고 다시 만듭니다.
pub fn prepare_output_dir(dir: &Path) -> Result<(), DiscoveryError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| output_error(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| output_error(dir, e))
}

/// 스캔별 결과 기록기
///
/// 결과 파일과 유형별 상세 파일을 열어 두고 스캔 결과를 순서대로 씁니다.
pub struct ResultWriter {
    results: OutputFile,
    /// `SourceType::code()` 순서
    verbose: Vec<OutputFile>,
}

/// 한 스캔 기록 통계
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    /// 기록한 탐지 수
    pub detections: usize,
    /// 기록한 상세 행 수
    pub verbose_lines: usize,
    /// 시그니처가 없어 상세 행을 생략한 탐지 수
    pub missing_signatures: usize,
}

impl ResultWriter {
    /// 출력 디렉토리에 스캔별 결과 파일을 만들고 상세 파일 헤더를 씁니다.
    pub fn create(dir: &Path) -> Result<Self, DiscoveryError> {
        let results = OutputFile::create(dir.join(RESULTS_FILE))?;
        let mut verbose = Vec::with_capacity(SourceType::ALL.len());
        for ty in SourceType::ALL {
            let mut stream = OutputFile::create(dir.join(verbose_file_name(ty)))?;
            stream.line(&verbose_header(ty))?;
            verbose.push(stream);
        }
        Ok(Self { results, verbose })
    }

    /// 한 스캔의 확정 탐지와 매치별 상세 행을 기록합니다.
    pub fn write_scan(
        &mut self,
        scan_path: &str,
        result: &ScanResult,
        signatures: &SignatureCatalog,
    ) -> Result<WriteStats, DiscoveryError> {
        let mut stats = WriteStats::default();
        for detection in &result.detections {
            self.results.line(&result_line(detection, scan_path))?;
            stats.detections += 1;

            let Some(signature) = signatures.get(detection.key.version_id) else {
                warn!(
                    scan = %scan_path,
                    version_id = %detection.key.version_id,
                    "signature missing, verbose lines omitted"
                );
                metrics::counter!(m::DISCOVERY_MISSING_SIGNATURES_TOTAL).increment(1);
                stats.missing_signatures += 1;
                continue;
            };

            for matched in &detection.matches {
                let Some(source) = result.source(matched.source) else {
                    continue;
                };
                let line = verbose_line(scan_path, signature, source);
                self.verbose[source.source_type.code() as usize].line(&line)?;
                stats.verbose_lines += 1;
            }
        }
        Ok(stats)
    }

    /// 모든 스트림을 flush합니다.
    pub fn finish(mut self) -> Result<(), DiscoveryError> {
        self.results.flush()?;
        for stream in &mut self.verbose {
            stream.flush()?;
        }
        Ok(())
    }
}

/// 집계 결과 파일을 씁니다.
pub fn write_aggregate_results(
    dir: &Path,
    rows: &[AggregateDetection],
) -> Result<(), DiscoveryError> {
    let mut out = OutputFile::create(dir.join(AGGREGATE_RESULTS_FILE))?;
    for row in rows {
        out.line(&aggregate_line(row))?;
    }
    out.flush()
}

/// 유형별 집계 소스 파일과 미사용 소스 파일을 씁니다.
///
/// 미사용 소스 수를 반환합니다.
pub fn write_aggregate_sources(
    dir: &Path,
    catalog: &SourceCatalog,
    rules: &RuleIndex,
) -> Result<usize, DiscoveryError> {
    let mut unused_total = 0;
    for ty in SourceType::ALL {
        let mut all = OutputFile::create(dir.join(aggregate_sources_file_name(ty)))?;
        let mut unused = OutputFile::create(dir.join(unused_sources_file_name(ty)))?;
        for source in catalog.snapshot(ty) {
            let line = source_line(&source);
            all.line(&line)?;
            if !rules.is_source_used(&source) {
                unused.line(&line)?;
                unused_total += 1;
            }
        }
        all.flush()?;
        unused.flush()?;
    }
    Ok(unused_total)
}

/// 이전 실행의 집계 소스 파일로 카탈로그를 채웁니다.
///
/// 파일이 없으면 경고 후 건너뜁니다. 등록된 소스 수를 반환합니다.
pub fn load_seed_sources(dir: &Path, catalog: &SourceCatalog) -> usize {
    let mut seeded = 0;
    for ty in SourceType::ALL {
        let path = dir.join(aggregate_sources_file_name(ty));
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "seed file unavailable, skipping");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            match parse_source_line(ty, line) {
                Ok(source) => {
                    if catalog.register(&source) {
                        seeded += 1;
                    }
                }
                Err(reason) => {
                    warn!(path = %path.display(), line = idx + 1, %reason, "skipping malformed seed line");
                }
            }
        }
    }
    debug!(seeded, "source catalog seeded");
    seeded
}
