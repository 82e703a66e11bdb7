//! 규칙 속성 매칭 스펙 -- glob 패턴 컴파일
//!
//! 규칙 속성 값에 `*`가 포함되면 glob 패턴으로 취급합니다. glob 문법은 `*`
//! (임의 길이 문자열) 하나뿐이며 나머지 문자는 모두 리터럴입니다.
//! 패턴은 라이브러리 로드 시 한 번만 정규식으로 컴파일되고, 매칭은 항상
//! 값 전체에 대해 수행됩니다.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::DiscoveryError;

/// 컴파일된 정규식 최대 크기 (바이트)
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// 대소문자 구분 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    /// 대소문자 구분
    Sensitive,
    /// 대소문자 무시
    Insensitive,
}

/// 컴파일된 glob 패턴
#[derive(Clone)]
pub struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    /// glob 패턴을 컴파일합니다.
    ///
    /// `*`로 분할한 리터럴 조각을 이스케이프한 뒤 `.*`로 연결하고
    /// 전체 일치가 되도록 앵커를 붙입니다.
    pub fn compile(glob: &str, case: CaseMode) -> Result<Self, DiscoveryError> {
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^(?:{body})$"))
            .case_insensitive(case == CaseMode::Insensitive)
            .dot_matches_new_line(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| DiscoveryError::Pattern {
                pattern: glob.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: glob.to_owned(),
            regex,
        })
    }

    /// 값 전체가 패턴과 일치하는지 확인합니다.
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// 원본 glob 문자열
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Glob").field(&self.source).finish()
    }
}

/// 단일 규칙 속성의 매칭 스펙
#[derive(Debug, Clone)]
pub enum AttrSpec {
    /// 빈 값: 모든 소스 값 허용
    Any,
    /// 정확한 일치
    Exact {
        /// 원본 값
        value: String,
        /// 대소문자 구분 방식
        case: CaseMode,
    },
    /// glob 패턴 전체 일치
    Pattern(Glob),
}

impl AttrSpec {
    /// 규칙 필드 값을 파싱합니다. `*`가 있으면 패턴, 없으면 정확한 일치입니다.
    pub fn parse(raw: &str, case: CaseMode) -> Result<Self, DiscoveryError> {
        if raw.is_empty() {
            Ok(Self::Any)
        } else if raw.contains('*') {
            Ok(Self::Pattern(Glob::compile(raw, case)?))
        } else {
            Ok(Self::Exact {
                value: raw.to_owned(),
                case,
            })
        }
    }

    /// 항상 패턴으로 취급하는 필드(파일 경로)를 파싱합니다.
    pub fn pattern(raw: &str, case: CaseMode) -> Result<Self, DiscoveryError> {
        if raw.is_empty() {
            Ok(Self::Any)
        } else {
            Ok(Self::Pattern(Glob::compile(raw, case)?))
        }
    }

    /// `*`를 특수 문자로 취급하지 않는 필드(파일 크기)를 파싱합니다.
    pub fn literal(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Any
        } else {
            Self::Exact {
                value: raw.to_owned(),
                case: CaseMode::Sensitive,
            }
        }
    }

    /// 소스 값이 스펙을 만족하는지 확인합니다.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact {
                value: expected,
                case: CaseMode::Sensitive,
            } => value == expected,
            Self::Exact {
                value: expected,
                case: CaseMode::Insensitive,
            } => value.to_lowercase() == expected.to_lowercase(),
            Self::Pattern(glob) => glob.is_match(value),
        }
    }

    /// 원본 규칙 필드 값
    pub fn raw(&self) -> &str {
        match self {
            Self::Any => "",
            Self::Exact { value, .. } => value,
            Self::Pattern(glob) => glob.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_any() {
        let spec = AttrSpec::parse("", CaseMode::Sensitive).unwrap();
        assert!(matches!(spec, AttrSpec::Any));
        assert!(spec.matches(""));
        assert!(spec.matches("anything"));
    }

    #[test]
    fn star_makes_pattern() {
        let spec = AttrSpec::parse("1.*", CaseMode::Sensitive).unwrap();
        assert!(matches!(spec, AttrSpec::Pattern(_)));
        assert!(spec.matches("1.4"));
        assert!(spec.matches("1."));
        assert!(!spec.matches("2.1"));
        assert!(!spec.matches("11.4"));
    }

    #[test]
    fn dot_is_literal_in_pattern() {
        let spec = AttrSpec::parse("1.*", CaseMode::Sensitive).unwrap();
        assert!(!spec.matches("1x4"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let spec = AttrSpec::parse("C++ (x86)*", CaseMode::Insensitive).unwrap();
        assert!(spec.matches("c++ (X86) Runtime"));
        assert!(!spec.matches("C (x86) Runtime"));
    }

    #[test]
    fn pattern_is_full_match() {
        let spec = AttrSpec::parse("*tool", CaseMode::Sensitive).unwrap();
        assert!(spec.matches("mytool"));
        assert!(!spec.matches("mytools"));
    }

    #[test]
    fn case_sensitive_pattern() {
        let spec = AttrSpec::parse("v*-BETA", CaseMode::Sensitive).unwrap();
        assert!(spec.matches("v1-BETA"));
        assert!(!spec.matches("v1-beta"));
    }

    #[test]
    fn case_insensitive_exact() {
        let spec = AttrSpec::parse("Acme Tool", CaseMode::Insensitive).unwrap();
        assert!(spec.matches("ACME TOOL"));
        assert!(spec.matches("acme tool"));
        assert!(!spec.matches("acme tools"));
    }

    #[test]
    fn case_sensitive_exact() {
        let spec = AttrSpec::parse("1.0a", CaseMode::Sensitive).unwrap();
        assert!(spec.matches("1.0a"));
        assert!(!spec.matches("1.0A"));
    }

    #[test]
    fn path_is_always_pattern() {
        let spec = AttrSpec::pattern("C:\\Program Files\\Acme\\", CaseMode::Insensitive).unwrap();
        assert!(matches!(spec, AttrSpec::Pattern(_)));
        assert!(spec.matches("c:\\program files\\acme\\"));
        assert!(!spec.matches("c:\\program files\\acme\\bin\\"));
    }

    #[test]
    fn literal_ignores_star() {
        let spec = AttrSpec::literal("10*");
        assert!(matches!(spec, AttrSpec::Exact { .. }));
        assert!(spec.matches("10*"));
        assert!(!spec.matches("100"));
    }

    #[test]
    fn raw_returns_source_text() {
        assert_eq!(AttrSpec::parse("1.*", CaseMode::Sensitive).unwrap().raw(), "1.*");
        assert_eq!(AttrSpec::literal("").raw(), "");
    }

    #[test]
    fn only_star_matches_everything() {
        let spec = AttrSpec::parse("*", CaseMode::Sensitive).unwrap();
        assert!(spec.matches(""));
        assert!(spec.matches("x\ny"));
    }
}
