//! 탐지 엔진 오케스트레이터 -- 스캔 스케줄링과 결과 발행
//!
//! [`DiscoveryEngine`]은 로드된 라이브러리와 공유 카탈로그/집계기를 담은
//! [`DiscoveryContext`]를 워커에 공유하고, 스캔 파일마다 하나의 블로킹 태스크를
//! 실행합니다. 동시에 실행되는 태스크 수는 세마포어로 워커 수만큼 제한됩니다.
//!
//! # 데이터 흐름
//!
//! ```text
//! find_scans ──> [Semaphore(N)] ──> spawn_blocking(load → match → publish)
//!                                          │
//!                                          ├──> SourceCatalog / ResultAggregator (잠금)
//!                                          └──> mpsc ──> ResultWriter 태스크 (results*.txt)
//! ```
//!
//! 모든 태스크가 끝나면 집계 결과와 집계 소스 파일을 기록하고 [`RunSummary`]를 반환합니다.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use inventa_core::metrics as m;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, info_span, warn};

use crate::aggregate::ResultAggregator;
use crate::catalog::SourceCatalog;
use crate::config::EngineConfig;
use crate::error::DiscoveryError;
use crate::exclusion::ExclusionGraph;
use crate::library::Library;
use crate::matcher::{ScanMatcher, ScanResult};
use crate::rules::RuleIndex;
use crate::scan::{find_scans, load_scan};
use crate::signature::SignatureCatalog;
use crate::writer::{self, ResultWriter, WriteStats};

/// 워커들이 공유하는 탐지 컨텍스트
///
/// 라이브러리 인덱스는 로드 후 읽기 전용이며 잠금 없이 읽습니다.
/// 소스 카탈로그와 결과 집계기는 각자의 잠금을 가지며 동시에 잡지 않습니다.
#[derive(Debug, Default)]
pub struct DiscoveryContext {
    pub rules: RuleIndex,
    pub exclusions: ExclusionGraph,
    pub signatures: SignatureCatalog,
    pub sources: SourceCatalog,
    pub results: ResultAggregator,
}

impl DiscoveryContext {
    /// 로드된 라이브러리로 컨텍스트를 생성합니다.
    pub fn new(library: Library) -> Self {
        Self {
            rules: library.rules,
            exclusions: library.exclusions,
            signatures: library.signatures,
            sources: SourceCatalog::new(),
            results: ResultAggregator::new(),
        }
    }
}

/// 한 스캔의 처리 결과 (기록 태스크로 전달)
#[derive(Debug)]
pub struct ScanOutcome {
    /// 스캔 파일 경로
    pub scan_path: String,
    /// 확정 탐지와 소스 arena
    pub result: ScanResult,
    /// 건너뛴 잘못된 라인 수
    pub malformed: usize,
    /// 전역 카탈로그에 새로 등록된 소스 수
    pub new_sources: usize,
}

impl ScanOutcome {
    /// 요약용 통계
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            sources: self.result.sources.len(),
            new_sources: self.new_sources,
            malformed: self.malformed,
            detections: self.result.detections.len(),
            excluded: self.result.exclusion.excluded,
            cycles: self.result.exclusion.cycles,
        }
    }
}

/// 한 스캔의 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub sources: usize,
    pub new_sources: usize,
    pub malformed: usize,
    pub detections: usize,
    pub excluded: usize,
    pub cycles: usize,
}

/// 스캔 하나를 읽고 매칭한 뒤 공유 상태에 발행합니다.
///
/// 블로킹 I/O를 수행하므로 `spawn_blocking` 안에서 호출합니다.
/// 소스 등록과 탐지 기록은 각각 별도의 잠금 구간에서 수행됩니다.
pub fn process_scan(
    context: &DiscoveryContext,
    path: &Path,
    max_scan_file_size: u64,
) -> Result<ScanOutcome, DiscoveryError> {
    let scan_path = path.display().to_string();
    let parsed = load_scan(path, max_scan_file_size)?;

    let new_sources = parsed
        .sources
        .iter()
        .filter(|source| context.sources.register(source))
        .count();

    let result = ScanMatcher::new(&context.rules, &context.exclusions, parsed.sources).run();

    for detection in &result.detections {
        context.results.record_confirmed(
            &detection.key.path,
            detection.key.version_id,
            detection.key.build_id,
            &scan_path,
        );
    }
    metrics::counter!(m::DISCOVERY_DETECTIONS_CONFIRMED_TOTAL)
        .increment(result.detections.len() as u64);
    metrics::counter!(m::DISCOVERY_DETECTIONS_EXCLUDED_TOTAL)
        .increment(result.exclusion.excluded as u64);

    Ok(ScanOutcome {
        scan_path,
        result,
        malformed: parsed.malformed,
        new_sources,
    })
}

/// 실행 요약
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// 실행 식별자 (UUID v4)
    pub run_id: String,
    /// 사용한 워커 수
    pub workers: usize,
    pub scans_dispatched: usize,
    pub scans_completed: usize,
    pub scans_failed: usize,
    /// 스캔에서 읽은 전체 소스 수
    pub sources_read: usize,
    /// 이전 실행 결과에서 시드된 소스 수
    pub sources_seeded: usize,
    /// 카탈로그의 고유 소스 수
    pub unique_sources: usize,
    /// 어떤 규칙도 사용하지 않는 고유 소스 수
    pub unused_sources: usize,
    pub malformed_lines: usize,
    /// 스캔별 확정 탐지 합계
    pub confirmed_detections: usize,
    pub excluded_detections: usize,
    pub exclusion_cycles: usize,
    pub missing_signatures: usize,
    /// 집계 결과 행 수
    pub aggregate_rows: usize,
    pub output_dir: String,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn absorb(&mut self, stats: ScanStats) {
        self.scans_completed += 1;
        self.sources_read += stats.sources;
        self.malformed_lines += stats.malformed;
        self.confirmed_detections += stats.detections;
        self.excluded_detections += stats.excluded;
        self.exclusion_cycles += stats.cycles;
    }
}

/// 소프트웨어 탐지 엔진
pub struct DiscoveryEngine {
    config: EngineConfig,
    context: Arc<DiscoveryContext>,
}

impl DiscoveryEngine {
    /// 로드된 라이브러리로 엔진을 생성합니다.
    pub fn new(config: EngineConfig, library: Library) -> Self {
        Self {
            config,
            context: Arc::new(DiscoveryContext::new(library)),
        }
    }

    /// 설정의 라이브러리 디렉토리에서 라이브러리를 로드하여 엔진을 생성합니다.
    pub async fn load(config: EngineConfig) -> Result<Self, DiscoveryError> {
        config.validate()?;
        let library = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || Library::load(&config))
                .await
                .map_err(|e| DiscoveryError::Worker(format!("spawn_blocking failed: {e}")))?
        }?;
        metrics::gauge!(m::DISCOVERY_RULES_LOADED).set(library.rules.len() as f64);
        Ok(Self::new(config, library))
    }

    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 공유 컨텍스트
    pub fn context(&self) -> &Arc<DiscoveryContext> {
        &self.context
    }

    /// 모든 스캔을 처리하고 결과 파일을 기록합니다.
    ///
    /// 실패한 스캔은 경고 후 `scans_failed`로 집계되며 실행을 중단하지 않습니다.
    /// 출력 디렉토리 준비, 결과 기록 실패는 실행 전체를 실패시킵니다.
    pub async fn run(self) -> Result<RunSummary, DiscoveryError> {
        let started = Instant::now();
        let workers = self.config.effective_workers();
        let mut summary = RunSummary {
            run_id: uuid::Uuid::new_v4().to_string(),
            workers,
            output_dir: self.config.output_dir.display().to_string(),
            ..Default::default()
        };

        info!(
            run_id = %summary.run_id,
            scan_dir = %self.config.scan_dir.display(),
            output_dir = %summary.output_dir,
            workers,
            rules = self.context.rules.len(),
            "discovery run started"
        );

        // 출력 디렉토리를 지우기 전에 이전 결과로 카탈로그를 채움
        let (seeded, scans) = {
            let context = Arc::clone(&self.context);
            let config = self.config.clone();
            blocking(move || {
                let seeded = if config.seed_sources {
                    writer::load_seed_sources(&config.output_dir, &context.sources)
                } else {
                    0
                };
                writer::prepare_output_dir(&config.output_dir)?;
                let scans = find_scans(&config.scan_dir, &config.scan_extension)?;
                Ok((seeded, scans))
            })
            .await?
        };
        summary.sources_seeded = seeded;
        summary.scans_dispatched = scans.len();

        let (tx, rx) = mpsc::channel::<ScanOutcome>(self.config.channel_capacity);
        let writer_task = {
            let context = Arc::clone(&self.context);
            let output_dir = self.config.output_dir.clone();
            tokio::task::spawn_blocking(move || write_scan_results(&output_dir, &context, rx))
        };

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = Vec::with_capacity(scans.len());
        for path in scans {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| DiscoveryError::Worker(format!("semaphore closed: {e}")))?;
            let context = Arc::clone(&self.context);
            let tx = tx.clone();
            let max_size = self.config.max_scan_file_size;

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                run_scan_task(&context, &path, max_size, &tx)
            });
            tasks.push(handle);
        }
        drop(tx);

        for handle in tasks {
            match handle.await {
                Ok(Ok(stats)) => summary.absorb(stats),
                Ok(Err(e)) => {
                    summary.scans_failed += 1;
                    warn!(error = %e, "scan failed");
                }
                Err(e) => {
                    summary.scans_failed += 1;
                    error!(error = %e, "scan task panicked");
                }
            }
        }

        let write_stats = writer_task
            .await
            .map_err(|e| DiscoveryError::Worker(format!("result writer panicked: {e}")))??;
        summary.missing_signatures = write_stats.missing_signatures;

        let (aggregate_rows, unused) = {
            let context = Arc::clone(&self.context);
            let output_dir = self.config.output_dir.clone();
            blocking(move || {
                let rows = context.results.snapshot();
                writer::write_aggregate_results(&output_dir, &rows)?;
                let unused =
                    writer::write_aggregate_sources(&output_dir, &context.sources, &context.rules)?;
                Ok((rows.len(), unused))
            })
            .await?
        };
        summary.aggregate_rows = aggregate_rows;
        summary.unused_sources = unused;
        summary.unique_sources = self.context.sources.len();
        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            run_id = %summary.run_id,
            scans_completed = summary.scans_completed,
            scans_failed = summary.scans_failed,
            confirmed_detections = summary.confirmed_detections,
            aggregate_rows = summary.aggregate_rows,
            unique_sources = summary.unique_sources,
            elapsed_ms = summary.elapsed_ms,
            "discovery run finished"
        );

        Ok(summary)
    }
}

/// 워커 태스크 본문: 스캔을 처리하고 결과를 기록 태스크로 보냅니다.
fn run_scan_task(
    context: &DiscoveryContext,
    path: &Path,
    max_size: u64,
    tx: &mpsc::Sender<ScanOutcome>,
) -> Result<ScanStats, DiscoveryError> {
    let span = info_span!("scan", path = %path.display());
    let _entered = span.enter();
    let started = Instant::now();

    let outcome = match process_scan(context, path, max_size) {
        Ok(outcome) => outcome,
        Err(e) => {
            metrics::counter!(m::DISCOVERY_SCANS_PROCESSED_TOTAL, m::LABEL_RESULT => "failure")
                .increment(1);
            return Err(e);
        }
    };
    let stats = outcome.stats();

    tx.blocking_send(outcome)
        .map_err(|_| DiscoveryError::Channel("result writer stopped".to_owned()))?;

    let elapsed = started.elapsed().as_secs_f64();
    metrics::histogram!(m::DISCOVERY_SCAN_DURATION_SECONDS).record(elapsed);
    metrics::counter!(m::DISCOVERY_SCANS_PROCESSED_TOTAL, m::LABEL_RESULT => "success")
        .increment(1);
    debug!(
        sources = stats.sources,
        new_sources = stats.new_sources,
        detections = stats.detections,
        elapsed_secs = elapsed,
        "scan completed"
    );

    Ok(stats)
}

/// 결과 기록 태스크: 채널이 닫힐 때까지 스캔 결과를 기록합니다.
fn write_scan_results(
    output_dir: &Path,
    context: &DiscoveryContext,
    mut rx: mpsc::Receiver<ScanOutcome>,
) -> Result<WriteStats, DiscoveryError> {
    let mut writer = ResultWriter::create(output_dir)?;
    let mut totals = WriteStats::default();
    while let Some(outcome) = rx.blocking_recv() {
        let stats = writer.write_scan(&outcome.scan_path, &outcome.result, &context.signatures)?;
        totals.detections += stats.detections;
        totals.verbose_lines += stats.verbose_lines;
        totals.missing_signatures += stats.missing_signatures;
    }
    writer.finish()?;
    Ok(totals)
}

/// 블로킹 클로저를 `spawn_blocking`으로 실행합니다.
async fn blocking<T, F>(f: F) -> Result<T, DiscoveryError>
where
    F: FnOnce() -> Result<T, DiscoveryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DiscoveryError::Worker(format!("spawn_blocking failed: {e}")))?
}
