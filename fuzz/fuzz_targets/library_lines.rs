#![no_main]

use inventa_discovery::library::{parse_exclusion_line, parse_rule_line, parse_signature_line};
use inventa_discovery::RuleIndex;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(def) = parse_rule_line(&line) {
        let mut index = RuleIndex::new();
        let _ = index.push(def);
    }
    let _ = parse_exclusion_line(&line);
    if let Ok(signature) = parse_signature_line(&line) {
        assert_eq!(signature.to_tsv().split('\t').count(), 15);
    }
});
