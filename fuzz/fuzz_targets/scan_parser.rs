#![no_main]

use inventa_discovery::scan::parse_scan;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let content = String::from_utf8_lossy(data);

    // 잘못된 라인은 건너뛰고 카운트만 해야 한다
    let parsed = parse_scan("fuzz.scan", &content);
    assert!(parsed.sources.len() + parsed.malformed <= content.lines().count());
    for source in &parsed.sources {
        assert_eq!(source.scan_path, "fuzz.scan");
        assert_eq!(source.key_upper, source.key_original.to_uppercase());
    }
});
