#![no_main]

use arbitrary::Arbitrary;
use inventa_discovery::pattern::{CaseMode, Glob};
use libfuzzer_sys::fuzz_target;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    glob: String,
    value: String,
    insensitive: bool,
}

fuzz_target!(|input: FuzzInput| {
    let case = if input.insensitive {
        CaseMode::Insensitive
    } else {
        CaseMode::Sensitive
    };
    let Ok(glob) = Glob::compile(&input.glob, case) else {
        return;
    };

    // 와일드카드 이외의 문자는 리터럴이므로 패턴 자신과 항상 일치해야 한다
    if !input.glob.contains('*') {
        assert!(glob.is_match(&input.glob));
    }
    let _ = glob.is_match(&input.value);
});
