#![no_main]

use arbitrary::Arbitrary;
use inventa_discovery::{
    ExclusionGraph, RuleDef, RuleIndex, ScanMatcher, Source, SourceType, VersionId,
};
use libfuzzer_sys::fuzz_target;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// (version, build, add/remove 여부, key 인덱스, productVersion)
    rules: Vec<(u8, u8, bool, u8, String)>,
    /// (excluded, superseding)
    exclusions: Vec<(u8, u8)>,
    /// (add/remove 여부, key 인덱스, productVersion, path)
    sources: Vec<(bool, u8, String, String)>,
}

const KEYS: [&str; 4] = ["app.exe", "App Suite", "lib.dll", "Tool"];

fn source_type(add_remove: bool) -> SourceType {
    if add_remove {
        SourceType::AddRemove
    } else {
        SourceType::File
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut rules = RuleIndex::new();
    for (version, build, add_remove, key, pv) in input.rules.into_iter().take(32) {
        let _ = rules.push(RuleDef {
            version_id: i64::from(version % 8),
            build_id: i64::from(build % 8),
            source_type: source_type(add_remove),
            key: KEYS[usize::from(key) % KEYS.len()].to_owned(),
            product_version: pv,
            product_name: String::new(),
            file_version: String::new(),
            file_size: String::new(),
            file_path: String::new(),
        });
    }

    // 순환이 있어도 패닉 없이 탐지를 유지해야 한다
    let mut exclusions = ExclusionGraph::new();
    for (excluded, superseding) in input.exclusions.into_iter().take(16) {
        exclusions.add_edge(
            VersionId(i64::from(excluded % 8)),
            VersionId(i64::from(superseding % 8)),
        );
    }

    let sources: Vec<Source> = input
        .sources
        .into_iter()
        .take(64)
        .map(|(add_remove, key, pv, path)| {
            let key = KEYS[usize::from(key) % KEYS.len()];
            if add_remove {
                Source::add_remove(key, &pv, "Vendor")
            } else {
                Source::file(&path, key, &pv, "Vendor", "", "", "", "")
            }
        })
        .collect();

    let result = ScanMatcher::new(&rules, &exclusions, sources).run();
    for detection in &result.detections {
        assert_eq!(
            detection.matches.len(),
            rules.by_build(detection.key.build_id).len()
        );
    }
});
