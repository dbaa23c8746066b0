//! Property catalog / 属性目录
//!
//! Holds two things the compiler needs:
//! - the fixed mapping from filter keys (`isAlphabetic`, `hasName`, ...) to the
//!   corpus column test they stand for
//! - the distinct values of every multi-select dimension, loaded once at startup
//!   and read-only afterwards

use std::cmp::Ordering;

use crate::corpus::CorpusStore;
use crate::error::Result;

/// Synthetic decomposition type: decomposition present without a `<tag>` / 规范分解
pub const CANONICAL_DECOMPOSITION: &str = "canonical";

/// Multi-select filter dimension / 多选筛选维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Scripts,
    Categories,
    Classes,
    Versions,
    DecompositionTypes,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Scripts,
        Dimension::Categories,
        Dimension::Classes,
        Dimension::Versions,
        Dimension::DecompositionTypes,
    ];

    /// Clause prefix in the filter string (without the colon) / 筛选串前缀
    pub fn prefix(self) -> &'static str {
        match self {
            Dimension::Scripts => "scripts",
            Dimension::Categories => "categories",
            Dimension::Classes => "classes",
            Dimension::Versions => "versions",
            Dimension::DecompositionTypes => "decompositionTypes",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.prefix() == prefix)
    }

    /// Column compared with `IN (...)`; decomposition types match by prefix instead
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Scripts => "c.script",
            Dimension::Categories => "c.general_category",
            Dimension::Classes => "c.bidi_class",
            Dimension::Versions => "c.age",
            Dimension::DecompositionTypes => "c.decomposition",
        }
    }
}

/// Boolean Unicode property stored as its own column / 布尔属性列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyFlag {
    Alphabetic,
    WhiteSpace,
    Dash,
    Mirrored,
    Math,
    Cased,
    IdStart,
    XidStart,
    XidContinue,
    IdContinue,
    GraphemeBase,
    GraphemeLink,
    GraphemeExtend,
    CaseIgnorable,
    ChangesWhenCasefolded,
    ChangesWhenCasemapped,
    ChangesWhenLowercased,
    ChangesWhenTitlecased,
    ChangesWhenUppercased,
    DefaultIgnorable,
    Lowercase,
    Uppercase,
}

impl PropertyFlag {
    pub const ALL: [PropertyFlag; 22] = [
        PropertyFlag::Alphabetic,
        PropertyFlag::WhiteSpace,
        PropertyFlag::Dash,
        PropertyFlag::Mirrored,
        PropertyFlag::Math,
        PropertyFlag::Cased,
        PropertyFlag::IdStart,
        PropertyFlag::XidStart,
        PropertyFlag::XidContinue,
        PropertyFlag::IdContinue,
        PropertyFlag::GraphemeBase,
        PropertyFlag::GraphemeLink,
        PropertyFlag::GraphemeExtend,
        PropertyFlag::CaseIgnorable,
        PropertyFlag::ChangesWhenCasefolded,
        PropertyFlag::ChangesWhenCasemapped,
        PropertyFlag::ChangesWhenLowercased,
        PropertyFlag::ChangesWhenTitlecased,
        PropertyFlag::ChangesWhenUppercased,
        PropertyFlag::DefaultIgnorable,
        PropertyFlag::Lowercase,
        PropertyFlag::Uppercase,
    ];

    /// Column name without the `c.` table alias / 不带表别名的列名
    pub fn column_name(self) -> &'static str {
        &self.column()[2..]
    }

    pub fn column(self) -> &'static str {
        match self {
            PropertyFlag::Alphabetic => "c.alphabetic",
            PropertyFlag::WhiteSpace => "c.white_space",
            PropertyFlag::Dash => "c.dash",
            PropertyFlag::Mirrored => "c.mirrored",
            PropertyFlag::Math => "c.math",
            PropertyFlag::Cased => "c.cased",
            PropertyFlag::IdStart => "c.id_start",
            PropertyFlag::XidStart => "c.xid_start",
            PropertyFlag::XidContinue => "c.xid_continue",
            PropertyFlag::IdContinue => "c.id_continue",
            PropertyFlag::GraphemeBase => "c.grapheme_base",
            PropertyFlag::GraphemeLink => "c.grapheme_link",
            PropertyFlag::GraphemeExtend => "c.grapheme_extend",
            PropertyFlag::CaseIgnorable => "c.case_ignorable",
            PropertyFlag::ChangesWhenCasefolded => "c.changes_when_casefolded",
            PropertyFlag::ChangesWhenCasemapped => "c.changes_when_casemapped",
            PropertyFlag::ChangesWhenLowercased => "c.changes_when_lowercased",
            PropertyFlag::ChangesWhenTitlecased => "c.changes_when_titlecased",
            PropertyFlag::ChangesWhenUppercased => "c.changes_when_uppercased",
            PropertyFlag::DefaultIgnorable => "c.default_ignorable_code_point",
            PropertyFlag::Lowercase => "c.lowercase",
            PropertyFlag::Uppercase => "c.uppercase",
        }
    }
}

/// Nullable column whose presence is filterable / 可判空列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceColumn {
    Name,
    NumericValue,
    Decomposition,
    UppercaseMapping,
    LowercaseMapping,
    TitlecaseMapping,
}

impl PresenceColumn {
    pub fn column(self) -> &'static str {
        match self {
            PresenceColumn::Name => "c.name",
            PresenceColumn::NumericValue => "c.numeric_value",
            PresenceColumn::Decomposition => "c.decomposition",
            PresenceColumn::UppercaseMapping => "c.uppercase_mapping",
            PresenceColumn::LowercaseMapping => "c.lowercase_mapping",
            PresenceColumn::TitlecaseMapping => "c.titlecase_mapping",
        }
    }
}

/// What a single-value property clause tests / 单值属性筛选的判定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyTest {
    Flag(PropertyFlag),
    Present(PresenceColumn),
    /// Canonical combining class greater than zero
    CombiningClass,
    /// Has a Bidi_Mirroring_Glyph
    Mirror,
    /// General category is `Lt`
    Titlecase,
    /// Codepoint is in the current user's favorites
    Favorited,
}

/// Filter key table, in the order the client lists the toggles / 筛选键映射表
const PROPERTY_KEYS: &[(&str, PropertyTest)] = &[
    ("isAlphabetic", PropertyTest::Flag(PropertyFlag::Alphabetic)),
    ("isWhiteSpace", PropertyTest::Flag(PropertyFlag::WhiteSpace)),
    ("isDash", PropertyTest::Flag(PropertyFlag::Dash)),
    ("isMirrored", PropertyTest::Flag(PropertyFlag::Mirrored)),
    ("hasName", PropertyTest::Present(PresenceColumn::Name)),
    ("hasNumericValue", PropertyTest::Present(PresenceColumn::NumericValue)),
    ("hasDecomposition", PropertyTest::Present(PresenceColumn::Decomposition)),
    ("hasUppercaseMapping", PropertyTest::Present(PresenceColumn::UppercaseMapping)),
    ("hasLowercaseMapping", PropertyTest::Present(PresenceColumn::LowercaseMapping)),
    ("hasTitlecaseMapping", PropertyTest::Present(PresenceColumn::TitlecaseMapping)),
    ("hasCombiningClass", PropertyTest::CombiningClass),
    ("hasMirror", PropertyTest::Mirror),
    ("math", PropertyTest::Flag(PropertyFlag::Math)),
    ("cased", PropertyTest::Flag(PropertyFlag::Cased)),
    ("idStart", PropertyTest::Flag(PropertyFlag::IdStart)),
    ("xidStart", PropertyTest::Flag(PropertyFlag::XidStart)),
    ("xidContinue", PropertyTest::Flag(PropertyFlag::XidContinue)),
    ("idContinue", PropertyTest::Flag(PropertyFlag::IdContinue)),
    ("graphemeBase", PropertyTest::Flag(PropertyFlag::GraphemeBase)),
    ("graphemeLink", PropertyTest::Flag(PropertyFlag::GraphemeLink)),
    ("graphemeExtend", PropertyTest::Flag(PropertyFlag::GraphemeExtend)),
    ("caseIgnorable", PropertyTest::Flag(PropertyFlag::CaseIgnorable)),
    ("changesWhenCasefolded", PropertyTest::Flag(PropertyFlag::ChangesWhenCasefolded)),
    ("changesWhenCasemapped", PropertyTest::Flag(PropertyFlag::ChangesWhenCasemapped)),
    ("changesWhenLowercased", PropertyTest::Flag(PropertyFlag::ChangesWhenLowercased)),
    ("changesWhenTitlecased", PropertyTest::Flag(PropertyFlag::ChangesWhenTitlecased)),
    ("changesWhenUppercased", PropertyTest::Flag(PropertyFlag::ChangesWhenUppercased)),
    ("defaultIgnorable", PropertyTest::Flag(PropertyFlag::DefaultIgnorable)),
    ("isLowercase", PropertyTest::Flag(PropertyFlag::Lowercase)),
    ("isUppercase", PropertyTest::Flag(PropertyFlag::Uppercase)),
    ("isTitlecase", PropertyTest::Titlecase),
    ("favorited", PropertyTest::Favorited),
];

/// Dimension values present in the corpus plus the static key mapping / 属性目录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyCatalog {
    scripts: Vec<String>,
    categories: Vec<String>,
    classes: Vec<String>,
    versions: Vec<String>,
    decomposition_types: Vec<String>,
}

impl PropertyCatalog {
    /// Build from raw distinct values, normalizing order / 构建目录并排序
    /// `decomposition_tags` are the bracketed tags found in the corpus; `canonical`
    /// is prepended here.
    pub fn new(
        scripts: Vec<String>,
        categories: Vec<String>,
        classes: Vec<String>,
        versions: Vec<String>,
        decomposition_tags: Vec<String>,
    ) -> Self {
        let mut decomposition_types = vec![CANONICAL_DECOMPOSITION.to_string()];
        decomposition_types.extend(
            natural_sorted(decomposition_tags)
                .into_iter()
                .filter(|t| t != CANONICAL_DECOMPOSITION),
        );

        Self {
            scripts: natural_sorted(scripts),
            categories: natural_sorted(categories),
            classes: natural_sorted(classes),
            versions: version_sorted(versions),
            decomposition_types,
        }
    }

    /// Load all dimension lists from the corpus store concurrently / 从语料库加载
    pub async fn load<S: CorpusStore + ?Sized>(store: &S) -> Result<Self> {
        let (scripts, categories, classes, versions, tags) = tokio::try_join!(
            store.distinct_scripts(),
            store.distinct_categories(),
            store.distinct_classes(),
            store.distinct_versions(),
            store.distinct_decomposition_types(),
        )?;

        let catalog = Self::new(scripts, categories, classes, versions, tags);
        tracing::info!(
            "Property catalog loaded: {} scripts, {} categories, {} classes, {} versions, {} decomposition types",
            catalog.scripts.len(),
            catalog.categories.len(),
            catalog.classes.len(),
            catalog.versions.len(),
            catalog.decomposition_types.len()
        );
        Ok(catalog)
    }

    /// Known values of a dimension / 维度的全部已知值
    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Scripts => &self.scripts,
            Dimension::Categories => &self.categories,
            Dimension::Classes => &self.classes,
            Dimension::Versions => &self.versions,
            Dimension::DecompositionTypes => &self.decomposition_types,
        }
    }

    /// Whether a selection includes every known value (equivalent to no filter) / 是否全选
    pub fn covers_all(&self, dimension: Dimension, selected: &[String]) -> bool {
        let known = self.values(dimension);
        !known.is_empty() && known.iter().all(|v| selected.contains(v))
    }

    /// Resolve a filter key to its test / 解析筛选键
    pub fn resolve(key: &str) -> Option<PropertyTest> {
        PROPERTY_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, test)| *test)
    }

    /// Filter key of a test (inverse of `resolve`) / 反查筛选键
    pub fn key_of(test: PropertyTest) -> &'static str {
        PROPERTY_KEYS
            .iter()
            .find(|(_, t)| *t == test)
            .map(|(k, _)| *k)
            .unwrap_or_default()
    }

    /// All filter keys in client order / 全部筛选键
    pub fn property_keys() -> impl Iterator<Item = &'static str> {
        PROPERTY_KEYS.iter().map(|(k, _)| *k)
    }
}

fn natural_sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort_by(|a, b| natord::compare(a, b));
    values.dedup();
    values
}

/// Parse `major.minor` for ordering; unparsable versions sort last / 解析版本号
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

fn version_sorted(mut versions: Vec<String>) -> Vec<String> {
    versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    versions.dedup();
    versions
}
