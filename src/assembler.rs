//! Result assembler: shapes corpus rows into client records / 结果组装

use crate::models::{CaseMapping, CharacterRecord, CharacterRow};
use crate::utils::{codepoint_to_string, format_code};

/// Named canonical combining classes / 规范组合类名称表
const COMBINING_CLASS_NAMES: &[(i64, &str)] = &[
    (0, "Not_Reordered"),
    (1, "Overlay"),
    (6, "Han_Reading"),
    (7, "Nukta"),
    (8, "Kana_Voicing"),
    (9, "Virama"),
    (200, "Attached_Below_Left"),
    (202, "Attached_Below"),
    (214, "Attached_Above"),
    (216, "Attached_Above_Right"),
    (218, "Below_Left"),
    (220, "Below"),
    (222, "Below_Right"),
    (224, "Left"),
    (226, "Right"),
    (228, "Above_Left"),
    (230, "Above"),
    (232, "Above_Right"),
    (233, "Double_Below"),
    (234, "Double_Above"),
    (240, "Iota_Subscript"),
];

/// Name of a combining class, empty when unnamed or absent / 组合类名称
pub fn combining_class_name(class: Option<i64>) -> &'static str {
    class
        .and_then(|c| COMBINING_CLASS_NAMES.iter().find(|(v, _)| *v == c))
        .map(|(_, name)| *name)
        .unwrap_or_default()
}

/// Which numeric field is set, by precedence Decimal > Digit > Numeric / 数值类型
pub fn numeric_type(row: &CharacterRow) -> &'static str {
    if row.decimal_digit_value.is_some() {
        "Decimal"
    } else if row.digit_value.is_some() {
        "Digit"
    } else if row.numeric_value.is_some() {
        "Numeric"
    } else {
        ""
    }
}

/// Leading `<tag>` of a decomposition, empty for canonical or none / 分解类型
pub fn decomposition_type(decomposition: Option<&str>) -> &str {
    decomposition
        .and_then(|d| d.strip_prefix('<'))
        .and_then(|rest| rest.split_once('>'))
        .map(|(tag, _)| tag)
        .unwrap_or_default()
}

fn case_mapping(target: Option<i64>, name: Option<String>) -> Option<CaseMapping> {
    let codepoint = target?;
    Some(CaseMapping {
        codepoint,
        unicode_id: u32::try_from(codepoint).map(format_code).unwrap_or_default(),
        character: codepoint_to_string(codepoint),
        name,
    })
}

/// Build the client record for one row / 组装单条记录
pub fn assemble(row: CharacterRow) -> CharacterRecord {
    let codepoint = u32::try_from(row.codepoint).unwrap_or_default();
    let flag = |value: Option<bool>| value.unwrap_or(false);

    CharacterRecord {
        codepoint,
        unicode_id: format_code(codepoint),
        character: codepoint_to_string(row.codepoint),
        combining_class_name: combining_class_name(row.canonical_combining_class).to_string(),
        decomposition_type: decomposition_type(row.decomposition.as_deref()).to_string(),
        numeric_type: numeric_type(&row).to_string(),
        uppercase: case_mapping(row.uppercase_mapping, row.uppercase_name),
        lowercase: case_mapping(row.lowercase_mapping, row.lowercase_name),
        titlecase: case_mapping(row.titlecase_mapping, row.titlecase_name),
        mirror_character: row.bidi_mirrored_glyph.and_then(codepoint_to_string),
        bidi_mirrored_glyph: row.bidi_mirrored_glyph,
        is_titlecase: row.general_category.as_deref() == Some("Lt"),
        is_alphabetic: flag(row.alphabetic),
        is_white_space: flag(row.white_space),
        is_dash: flag(row.dash),
        is_mirrored: flag(row.mirrored),
        is_math: flag(row.math),
        is_cased: flag(row.cased),
        is_id_start: flag(row.id_start),
        is_xid_start: flag(row.xid_start),
        is_xid_continue: flag(row.xid_continue),
        is_id_continue: flag(row.id_continue),
        is_grapheme_base: flag(row.grapheme_base),
        is_grapheme_link: flag(row.grapheme_link),
        is_grapheme_extend: flag(row.grapheme_extend),
        is_case_ignorable: flag(row.case_ignorable),
        changes_when_casefolded: flag(row.changes_when_casefolded),
        changes_when_casemapped: flag(row.changes_when_casemapped),
        changes_when_lowercased: flag(row.changes_when_lowercased),
        changes_when_titlecased: flag(row.changes_when_titlecased),
        changes_when_uppercased: flag(row.changes_when_uppercased),
        is_default_ignorable: flag(row.default_ignorable_code_point),
        is_lowercase: flag(row.lowercase),
        is_uppercase: flag(row.uppercase),
        code: row.code,
        name: row.name,
        general_category: row.general_category,
        script: row.script,
        bidi_class: row.bidi_class,
        block: row.block,
        age: row.age,
        canonical_combining_class: row.canonical_combining_class,
        decomposition: row.decomposition,
        numeric_value: row.numeric_value,
        digit_value: row.digit_value,
        decimal_digit_value: row.decimal_digit_value,
    }
}
