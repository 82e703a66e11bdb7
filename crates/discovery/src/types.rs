//! 도메인 타입 -- 탐지 엔진 전용 데이터 구조
//!
//! 소스 유형, 식별자 newtype, 인벤토리 소스 레코드를 정의합니다.
//! 규칙과 소스는 주소가 아닌 안정적인 인덱스(`RuleId`, `SourceId`)로 참조됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 인벤토리 소스 유형
///
/// 라이브러리 파일에서는 숫자 코드(0, 1, 2)로 표기됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// 설치된 파일
    File,
    /// 프로그램 추가/제거 항목
    AddRemove,
    /// 패키지 설치 항목
    PkgInst,
}

impl SourceType {
    /// 모든 소스 유형 (출력 순서)
    pub const ALL: [SourceType; 3] = [Self::File, Self::AddRemove, Self::PkgInst];

    /// 라이브러리 숫자 코드에서 소스 유형을 파싱합니다.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::File),
            "1" => Some(Self::AddRemove),
            "2" => Some(Self::PkgInst),
            _ => None,
        }
    }

    /// 라이브러리 숫자 코드를 반환합니다.
    pub fn code(self) -> u8 {
        match self {
            Self::File => 0,
            Self::AddRemove => 1,
            Self::PkgInst => 2,
        }
    }

    /// 출력 파일에 쓰이는 판별자 문자열 (`file`, `addremove`, `pkginst`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::AddRemove => "addremove",
            Self::PkgInst => "pkginst",
        }
    }

    /// 출력 파일 이름에 쓰이는 복수형 (`files`, `addremoves`, `pkginsts`)
    pub fn plural(self) -> &'static str {
        match self {
            Self::File => "files",
            Self::AddRemove => "addremoves",
            Self::PkgInst => "pkginsts",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 규칙 식별자 (로드 순서 1..n)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub u32);

/// 제품 버전 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId(pub i64);

/// 제품 빌드 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildId(pub i64);

/// 스캔 내 소스 인덱스 (스캔별 소스 arena의 위치)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub usize);

macro_rules! impl_id_display {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

impl_id_display!(RuleId, VersionId, BuildId, SourceId);

/// 인벤토리 소스 레코드
///
/// 스캔 파일의 한 라인에서 생성되며 생성 후 변경되지 않습니다.
/// 유형에 따라 사용하지 않는 필드는 빈 문자열입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// 소스 유형
    pub source_type: SourceType,
    /// 파일 이름, 추가/제거 표시 이름, 또는 패키지 이름
    pub key_original: String,
    /// `key_original`의 대문자 형태 (조회 키)
    pub key_upper: String,
    /// 제품 버전
    pub product_version: String,
    /// 제품 이름 (파일 전용)
    pub product_name: String,
    /// 파일 버전 (파일 전용)
    pub file_version: String,
    /// 파일 크기 (파일 전용, 원문 그대로)
    pub file_size: String,
    /// 파일 경로 (파일 전용). 빈 값은 경로 없는 증거
    pub file_path: String,
    /// 파일 설명 (파일 전용)
    pub file_description: String,
    /// 회사명, 게시자, 또는 공급자
    pub company_name: String,
    /// 이 소스를 읽은 스캔 파일 경로
    pub scan_path: String,
}

impl Source {
    fn new(source_type: SourceType, key: &str, product_version: &str, company: &str) -> Self {
        Self {
            source_type,
            key_original: key.to_owned(),
            key_upper: key.to_uppercase(),
            product_version: product_version.to_owned(),
            product_name: String::new(),
            file_version: String::new(),
            file_size: String::new(),
            file_path: String::new(),
            file_description: String::new(),
            company_name: company.to_owned(),
            scan_path: String::new(),
        }
    }

    /// 추가/제거 항목 소스를 생성합니다.
    pub fn add_remove(display_name: &str, display_version: &str, publisher: &str) -> Self {
        Self::new(SourceType::AddRemove, display_name, display_version, publisher)
    }

    /// 패키지 설치 소스를 생성합니다.
    pub fn pkg_inst(name: &str, version: &str, vendor: &str) -> Self {
        Self::new(SourceType::PkgInst, name, version, vendor)
    }

    /// 파일 소스를 생성합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn file(
        file_path: &str,
        file_name: &str,
        product_version: &str,
        company_name: &str,
        product_name: &str,
        file_description: &str,
        file_version: &str,
        file_size: &str,
    ) -> Self {
        Self {
            product_name: product_name.to_owned(),
            file_version: file_version.to_owned(),
            file_size: file_size.to_owned(),
            file_path: file_path.to_owned(),
            file_description: file_description.to_owned(),
            ..Self::new(SourceType::File, file_name, product_version, company_name)
        }
    }

    /// 스캔 경로를 설정합니다.
    pub fn with_scan_path(mut self, scan_path: impl Into<String>) -> Self {
        self.scan_path = scan_path.into();
        self
    }

    /// 전역 소스 카탈로그의 중복 제거 키를 반환합니다.
    pub fn catalog_key(&self) -> SourceKey {
        let mut parts: Vec<&str> = vec![
            &self.key_upper,
            &self.product_version,
            &self.company_name,
        ];
        if self.source_type == SourceType::File {
            parts.extend([
                self.product_name.as_str(),
                self.file_description.as_str(),
                self.file_version.as_str(),
                self.file_size.as_str(),
            ]);
        }
        SourceKey(format!("{}:{}", self.source_type.code(), parts.join("\t")))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' {} ({})",
            self.source_type, self.key_original, self.product_version, self.company_name
        )
    }
}

/// 소스 카탈로그 키
///
/// 유형 코드와 식별 필드를 탭으로 연결한 문자열입니다.
/// 필드 값에는 탭이 들어갈 수 없으므로 경계가 모호하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(String);

impl SourceKey {
    /// 키 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_codes() {
        assert_eq!(SourceType::from_code("0"), Some(SourceType::File));
        assert_eq!(SourceType::from_code("1"), Some(SourceType::AddRemove));
        assert_eq!(SourceType::from_code("2"), Some(SourceType::PkgInst));
        assert_eq!(SourceType::from_code("3"), None);
        assert_eq!(SourceType::from_code(""), None);
        for ty in SourceType::ALL {
            assert_eq!(SourceType::from_code(&ty.code().to_string()), Some(ty));
        }
    }

    #[test]
    fn source_type_display() {
        assert_eq!(SourceType::File.to_string(), "file");
        assert_eq!(SourceType::AddRemove.to_string(), "addremove");
        assert_eq!(SourceType::PkgInst.plural(), "pkginsts");
    }

    #[test]
    fn source_key_is_uppercased() {
        let source = Source::add_remove("Acme Tool", "1.0", "Acme");
        assert_eq!(source.key_original, "Acme Tool");
        assert_eq!(source.key_upper, "ACME TOOL");
        assert!(source.file_path.is_empty());
    }

    #[test]
    fn file_source_fields() {
        let source = Source::file(
            "C:\\App\\",
            "app.exe",
            "2.1",
            "Acme",
            "App",
            "App binary",
            "2.1.0.5",
            "1024",
        )
        .with_scan_path("host1.scan");
        assert_eq!(source.source_type, SourceType::File);
        assert_eq!(source.key_upper, "APP.EXE");
        assert_eq!(source.file_path, "C:\\App\\");
        assert_eq!(source.file_size, "1024");
        assert_eq!(source.scan_path, "host1.scan");
    }

    #[test]
    fn catalog_key_ignores_scan_path_and_case_of_key() {
        let a = Source::add_remove("Tool", "1.0", "Acme").with_scan_path("a.scan");
        let b = Source::add_remove("TOOL", "1.0", "Acme").with_scan_path("b.scan");
        assert_eq!(a.catalog_key(), b.catalog_key());
    }

    #[test]
    fn catalog_key_distinguishes_types() {
        let a = Source::add_remove("Tool", "1.0", "Acme");
        let p = Source::pkg_inst("Tool", "1.0", "Acme");
        assert_ne!(a.catalog_key(), p.catalog_key());
    }

    #[test]
    fn catalog_key_is_unambiguous_across_field_boundaries() {
        let a = Source::add_remove("AB", "C", "");
        let b = Source::add_remove("A", "BC", "");
        assert_ne!(a.catalog_key(), b.catalog_key());
    }

    #[test]
    fn file_catalog_key_includes_file_fields() {
        let a = Source::file("p", "f", "1", "c", "n", "d", "1.0", "10");
        let b = Source::file("p", "f", "1", "c", "n", "d", "1.0", "11");
        assert_ne!(a.catalog_key(), b.catalog_key());
        // 경로는 키에 포함되지 않음
        let c = Source::file("q", "f", "1", "c", "n", "d", "1.0", "10");
        assert_eq!(a.catalog_key(), c.catalog_key());
    }
}
