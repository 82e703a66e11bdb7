//! Integration tests for the discovery engine
//!
//! Tests the full pipeline: library files -> scan files -> matching -> result files

use std::path::{Path, PathBuf};

use inventa_discovery::writer::{
    AGGREGATE_RESULTS_FILE, RESULTS_FILE, aggregate_sources_file_name, unused_sources_file_name,
    verbose_file_name, verbose_header,
};
use inventa_discovery::{
    DiscoveryEngine, DiscoveryError, EngineConfig, EngineConfigBuilder, Library, SourceType,
};

const READER_PATH: &str = "C:\\Program Files\\Adobe\\Reader\\";

/// Adobe Reader XI (build 1000) needs both a file and an add/remove entry,
/// Reader DC (build 2000), 7-Zip (build 3000) and OpenSSL (build 4000) need one record each.
const RULES: &str = "\
100\t1000\t0\tAcroRd32.exe\t11.*\t\t\t\t
100\t1000\t1\tAdobe Reader XI\t11.*\t\t\t\t
200\t2000\t0\tAcroRd32.exe\t15.*\t\t\t\t*\\Adobe\\*
300\t3000\t1\t7-Zip 19.00 (x64)\t19.00\t\t\t\t
400\t4000\t2\topenssl\t1.1.1*\t\t\t\t
";

/// Reader XI is superseded by Reader DC.
const EXCLUSIONS: &str = "100\t200\t0\n";

/// No signature for OpenSSL (version 400).
const SIGNATURES: &str = "\
1\tAdobe\twww.adobe.com\t10\tAcrobat Reader\t0\tViewer\t100\tReader XI\t11.0\t11\t0\t\t\t0
1\tAdobe\twww.adobe.com\t11\tAcrobat Reader DC\t0\tViewer\t200\tReader DC\t15.0\t15\t0\t\t\t0
2\tIgor Pavlov\twww.7-zip.org\t20\t7-Zip\t0\tArchiver\t300\t7-Zip 19\t19.00\t19\t0\t\t\t0
";

fn write_library(dir: &Path) -> PathBuf {
    let library = dir.join("library");
    std::fs::create_dir_all(&library).unwrap();
    std::fs::write(library.join("DiscoveryRules.txt"), RULES).unwrap();
    std::fs::write(library.join("DiscoveryVERs.txt"), EXCLUSIONS).unwrap();
    std::fs::write(library.join("DiscoverySignatures.txt"), SIGNATURES).unwrap();
    library
}

fn reader_xi_scan() -> String {
    format!(
        "<SourceName=AddRemoves>\n\
         <Fields=DisplayName,DisplayVersion,Publisher>\n\
         Adobe Reader XI\t11.0.23\tAdobe Systems\t{READER_PATH}\tMsiExec.exe\t0\n\
         <SourceName=Files>\n\
         {READER_PATH}\tAcroRd32.exe\t11.0.23\tAdobe Systems\tAdobe Reader\tAdobe Reader\t11.0.23.22\t1492136\n"
    )
}

fn upgraded_reader_scan() -> String {
    format!(
        "<SourceName=AddRemoves>\n\
         Adobe Reader XI\t11.0.1\tAdobe Systems\t\t\t0\n\
         <SourceName=Files>\n\
         {READER_PATH}\tacrord32.exe\t11.0.1\tAdobe Systems\tAdobe Reader\tAdobe Reader\t11.0.1.36\t1490000\n\
         {READER_PATH}\tAcroRd32.exe\t15.0.2\tAdobe Systems\tAdobe Acrobat DC\tAdobe Acrobat\t15.0.2.1\t2100000\n"
    )
}

fn tools_scan() -> String {
    "<SourceName=AddRemoves>\n\
     7-Zip 19.00 (x64)\t19.00\tIgor Pavlov\t\t\t0\n\
     Notepad++\t8.1\tNotepad++ Team\t\t\t0\n\
     broken line\twith three\tfields\n\
     <SourceName=PkgInsts>\n\
     openssl\t1.1.1k\tOpenSSL Project\n"
        .to_owned()
}

struct Fixture {
    _dir: tempfile::TempDir,
    library: PathBuf,
    scans: PathBuf,
    output: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let library = write_library(dir.path());
    let scans = dir.path().join("scans");
    std::fs::create_dir_all(scans.join("site-b")).unwrap();
    std::fs::write(scans.join("host-a.scan"), reader_xi_scan()).unwrap();
    std::fs::write(scans.join("host-b.scan"), upgraded_reader_scan()).unwrap();
    std::fs::write(scans.join("host-c.scan"), tools_scan()).unwrap();
    std::fs::write(scans.join("site-b").join("host-d.scan"), tools_scan()).unwrap();
    std::fs::write(scans.join("notes.txt"), "not a scan").unwrap();
    let output = dir.path().join("results");
    Fixture {
        library,
        scans,
        output,
        _dir: dir,
    }
}

fn config(fx: &Fixture) -> EngineConfig {
    EngineConfigBuilder::new()
        .library_dir(&fx.library)
        .scan_dir(&fx.scans)
        .output_dir(&fx.output)
        .workers(3)
        .build()
        .unwrap()
}

fn data_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Test end-to-end run: library load -> 4 scans -> all result files
#[tokio::test]
async fn test_e2e_discovery_run() {
    let fx = fixture();
    let engine = DiscoveryEngine::load(config(&fx)).await.unwrap();
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.workers, 3);
    assert_eq!(summary.scans_dispatched, 4);
    assert_eq!(summary.scans_completed, 4);
    assert_eq!(summary.scans_failed, 0);
    assert_eq!(summary.sources_read, 11);
    assert_eq!(summary.unique_sources, 8);
    assert_eq!(summary.malformed_lines, 2);
    // host-a: Reader XI, host-b: Reader DC, host-c/d: 7-Zip + OpenSSL
    assert_eq!(summary.confirmed_detections, 6);
    assert_eq!(summary.excluded_detections, 1);
    assert_eq!(summary.exclusion_cycles, 0);
    assert_eq!(summary.missing_signatures, 2);
    assert_eq!(summary.aggregate_rows, 4);
    assert_eq!(summary.unused_sources, 1);
    assert!(!summary.run_id.is_empty());

    assert_eq!(data_lines(&fx.output.join(RESULTS_FILE)).len(), 6);
}

/// Test that the aggregate file tallies identical detections across scans
#[tokio::test]
async fn test_aggregate_counts_across_scans() {
    let fx = fixture();
    DiscoveryEngine::load(config(&fx))
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let rows = data_lines(&fx.output.join(AGGREGATE_RESULTS_FILE));
    let parsed: Vec<Vec<&str>> = rows.iter().map(|r| r.split('\t').collect()).collect();
    assert_eq!(parsed.len(), 4);

    // sorted by (buildId, uppercase path)
    assert_eq!(parsed[0][..4], ["100", "1000", READER_PATH, "1"]);
    assert!(parsed[0][4].ends_with("host-a.scan"));
    assert_eq!(parsed[1][..4], ["200", "2000", READER_PATH, "1"]);
    assert!(parsed[1][4].ends_with("host-b.scan"));
    assert_eq!(parsed[2][..4], ["300", "3000", "", "2"]);
    assert_eq!(parsed[3][..4], ["400", "4000", "", "2"]);
}

/// Test that superseded versions at the same path are not reported
#[tokio::test]
async fn test_superseded_version_is_excluded() {
    let fx = fixture();
    DiscoveryEngine::load(config(&fx))
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let results = data_lines(&fx.output.join(RESULTS_FILE));
    let host_b: Vec<_> = results
        .iter()
        .filter(|line| line.ends_with("host-b.scan"))
        .collect();
    assert_eq!(host_b.len(), 1);
    assert!(host_b[0].starts_with("200\t2000\t"));
}

/// Test verbose streams: header row, one row per match, split by source type
#[tokio::test]
async fn test_verbose_streams_split_by_source_type() {
    let fx = fixture();
    DiscoveryEngine::load(config(&fx))
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let files = data_lines(&fx.output.join(verbose_file_name(SourceType::File)));
    assert_eq!(files[0], verbose_header(SourceType::File));
    // Reader XI file match + Reader DC file match
    assert_eq!(files.len(), 3);
    for row in &files[1..] {
        let fields: Vec<_> = row.split('\t').collect();
        assert_eq!(fields.len(), 22);
        assert_eq!(fields[16], "file");
        assert_eq!(fields[18], "AcroRd32.exe");
    }

    let add_removes = data_lines(&fx.output.join(verbose_file_name(SourceType::AddRemove)));
    // Reader XI add/remove match (merged from non-path evidence) + two 7-Zip rows
    assert_eq!(add_removes.len(), 4);
    assert!(add_removes[1..].iter().all(|row| row.contains("\taddremove\t")));

    // OpenSSL has no signature, so its rows are omitted
    let pkg_insts = data_lines(&fx.output.join(verbose_file_name(SourceType::PkgInst)));
    assert_eq!(pkg_insts, vec![verbose_header(SourceType::PkgInst)]);
}

/// Test aggregate source files and their unused companions
#[tokio::test]
async fn test_aggregate_sources_and_unused() {
    let fx = fixture();
    DiscoveryEngine::load(config(&fx))
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let files = data_lines(&fx.output.join(aggregate_sources_file_name(SourceType::File)));
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|row| row.split('\t').count() == 9));

    let add_removes = data_lines(
        &fx.output
            .join(aggregate_sources_file_name(SourceType::AddRemove)),
    );
    assert_eq!(add_removes.len(), 4);

    let pkg_insts = data_lines(&fx.output.join(aggregate_sources_file_name(SourceType::PkgInst)));
    assert_eq!(pkg_insts.len(), 1);
    assert!(pkg_insts[0].starts_with("openssl\t1.1.1k\tOpenSSL Project\t"));

    let unused = data_lines(&fx.output.join(unused_sources_file_name(SourceType::AddRemove)));
    assert_eq!(unused.len(), 1);
    assert!(unused[0].starts_with("Notepad++\t8.1\t"));
    assert!(data_lines(&fx.output.join(unused_sources_file_name(SourceType::File))).is_empty());
}

/// Test that a second run seeded from the first keeps first-seen origins
#[tokio::test]
async fn test_seeded_run_keeps_first_seen_origins() {
    let fx = fixture();
    let first = DiscoveryEngine::load(config(&fx))
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    let before = data_lines(&fx.output.join(aggregate_sources_file_name(SourceType::PkgInst)));

    // the second run sees only a copy of host-c under another name
    let rescans = fx.scans.parent().unwrap().join("rescans");
    std::fs::create_dir_all(&rescans).unwrap();
    std::fs::write(rescans.join("host-z.scan"), tools_scan()).unwrap();

    let config = EngineConfigBuilder::new()
        .library_dir(&fx.library)
        .scan_dir(&rescans)
        .output_dir(&fx.output)
        .seed_sources(true)
        .build()
        .unwrap();
    let second = DiscoveryEngine::load(config)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(second.sources_seeded, first.unique_sources);
    assert_eq!(second.unique_sources, first.unique_sources);
    let after = data_lines(&fx.output.join(aggregate_sources_file_name(SourceType::PkgInst)));
    assert_eq!(before, after);
    assert!(!after[0].ends_with("host-z.scan"));
}

/// Test that seeding from an empty output directory is not an error
#[tokio::test]
async fn test_seed_without_previous_results() {
    let fx = fixture();
    let config = EngineConfigBuilder::new()
        .library_dir(&fx.library)
        .scan_dir(&fx.scans)
        .output_dir(&fx.output)
        .seed_sources(true)
        .build()
        .unwrap();
    let summary = DiscoveryEngine::load(config)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.sources_seeded, 0);
    assert_eq!(summary.scans_completed, 4);
}

/// Test that a missing library file is fatal
#[tokio::test]
async fn test_missing_library_file_is_fatal() {
    let fx = fixture();
    std::fs::remove_file(fx.library.join("DiscoverySignatures.txt")).unwrap();
    let result = DiscoveryEngine::load(config(&fx)).await;
    assert!(matches!(result, Err(DiscoveryError::LibraryLoad { .. })));
}

/// Test that an unparseable rule line reports its line number
#[tokio::test]
async fn test_malformed_rule_is_fatal_with_location() {
    let fx = fixture();
    std::fs::write(
        fx.library.join("DiscoveryRules.txt"),
        format!("{RULES}abc\t1\t0\tx.exe\t\t\t\t\t\n"),
    )
    .unwrap();
    let err = DiscoveryEngine::load(config(&fx)).await.err().unwrap();
    match err {
        DiscoveryError::InvalidRecord { line, .. } => assert_eq!(line, 6),
        other => panic!("unexpected error: {other}"),
    }
}

/// Test library cycle detection and matching against a cyclic exclusion graph
#[tokio::test]
async fn test_exclusion_cycle_keeps_detections() {
    let fx = fixture();
    std::fs::write(fx.library.join("DiscoveryVERs.txt"), "100\t200\n200\t100\n").unwrap();

    let library = Library::load(&config(&fx)).unwrap();
    assert!(matches!(
        library.check_exclusion_cycles(),
        Err(DiscoveryError::ExclusionCycle { .. })
    ));

    let summary = DiscoveryEngine::new(config(&fx), library)
        .run()
        .await
        .unwrap();
    // host-a: Reader DC is absent, the walk returns to Reader XI and the detection is kept
    assert_eq!(summary.exclusion_cycles, 1);
    // host-b: both versions are present and each supersedes the other
    assert_eq!(summary.excluded_detections, 2);
    assert_eq!(summary.confirmed_detections, 5);
}

/// Test that an output directory overlapping the inputs is rejected before anything is deleted
#[test]
fn test_output_dir_overlapping_inputs_is_rejected() {
    let fx = fixture();
    for output in [
        fx.scans.clone(),
        fx.library.clone(),
        fx.scans.parent().unwrap().to_path_buf(),
    ] {
        let err = EngineConfigBuilder::new()
            .library_dir(&fx.library)
            .scan_dir(&fx.scans)
            .output_dir(&output)
            .build()
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Config { ref field, .. } if field == "output_dir"));
    }
    assert!(fx.scans.join("host-a.scan").exists());
    assert!(fx.library.join("DiscoveryRules.txt").exists());
}
