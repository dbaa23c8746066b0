use serde::{Deserialize, Serialize};

/// Raw `characters` row as read by the corpus store / 字符原始行
///
/// The three `*_name` fields are not columns of `characters`; the store fetches
/// them in the same query from the rows the case mappings point at.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct CharacterRow {
    pub codepoint: i64,
    pub code: String,
    pub name: Option<String>,
    pub general_category: Option<String>,
    pub script: Option<String>,
    pub bidi_class: Option<String>,
    pub canonical_combining_class: Option<i64>,
    pub decomposition: Option<String>,
    pub numeric_value: Option<String>,
    pub digit_value: Option<String>,
    pub decimal_digit_value: Option<String>,
    pub uppercase_mapping: Option<i64>,
    pub lowercase_mapping: Option<i64>,
    pub titlecase_mapping: Option<i64>,
    pub bidi_mirrored_glyph: Option<i64>,
    pub block: Option<String>,
    pub age: Option<String>,
    pub alphabetic: Option<bool>,
    pub white_space: Option<bool>,
    pub dash: Option<bool>,
    pub mirrored: Option<bool>,
    pub math: Option<bool>,
    pub cased: Option<bool>,
    pub id_start: Option<bool>,
    pub xid_start: Option<bool>,
    pub xid_continue: Option<bool>,
    pub id_continue: Option<bool>,
    pub grapheme_base: Option<bool>,
    pub grapheme_link: Option<bool>,
    pub grapheme_extend: Option<bool>,
    pub case_ignorable: Option<bool>,
    pub changes_when_casefolded: Option<bool>,
    pub changes_when_casemapped: Option<bool>,
    pub changes_when_lowercased: Option<bool>,
    pub changes_when_titlecased: Option<bool>,
    pub changes_when_uppercased: Option<bool>,
    pub default_ignorable_code_point: Option<bool>,
    pub lowercase: Option<bool>,
    pub uppercase: Option<bool>,
    pub uppercase_name: Option<String>,
    pub lowercase_name: Option<String>,
    pub titlecase_name: Option<String>,
}

/// Character record returned to clients / 返回给客户端的字符记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterRecord {
    pub codepoint: u32,
    pub code: String,
    pub unicode_id: String,
    pub character: Option<String>,
    pub name: Option<String>,
    pub general_category: Option<String>,
    pub script: Option<String>,
    pub bidi_class: Option<String>,
    pub block: Option<String>,
    pub age: Option<String>,
    pub canonical_combining_class: Option<i64>,
    pub combining_class_name: String,
    pub decomposition: Option<String>,
    pub decomposition_type: String,
    pub numeric_value: Option<String>,
    pub digit_value: Option<String>,
    pub decimal_digit_value: Option<String>,
    pub numeric_type: String,
    pub uppercase: Option<CaseMapping>,
    pub lowercase: Option<CaseMapping>,
    pub titlecase: Option<CaseMapping>,
    pub bidi_mirrored_glyph: Option<i64>,
    pub mirror_character: Option<String>,
    pub is_alphabetic: bool,
    pub is_white_space: bool,
    pub is_dash: bool,
    pub is_mirrored: bool,
    pub is_math: bool,
    pub is_cased: bool,
    pub is_id_start: bool,
    pub is_xid_start: bool,
    pub is_xid_continue: bool,
    pub is_id_continue: bool,
    pub is_grapheme_base: bool,
    pub is_grapheme_link: bool,
    pub is_grapheme_extend: bool,
    pub is_case_ignorable: bool,
    pub changes_when_casefolded: bool,
    pub changes_when_casemapped: bool,
    pub changes_when_lowercased: bool,
    pub changes_when_titlecased: bool,
    pub changes_when_uppercased: bool,
    pub is_default_ignorable: bool,
    pub is_lowercase: bool,
    pub is_uppercase: bool,
    pub is_titlecase: bool,
}

/// Target of a simple case mapping / 大小写映射目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseMapping {
    pub codepoint: i64,
    pub unicode_id: String,
    pub character: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub google_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub last_login: Option<String>,
    pub created_at: String,
}
