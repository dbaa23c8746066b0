//! Corpus writer used by the import pipeline / 语料库写入接口
//!
//! Keeps the derived data consistent with each character row: the `code`
//! column, the materialized name trigrams and their count.

use sqlx::SqlitePool;

use crate::error::{ExplorerError, Result};
use crate::filter::catalog::PropertyFlag;
use crate::filter::trigram::trigrams;
use crate::utils::{format_code, MAX_CODEPOINT};

/// Character as delivered by the import pipeline / 待写入的字符
#[derive(Debug, Clone, Default)]
pub struct NewCharacter {
    pub codepoint: u32,
    pub name: Option<String>,
    pub general_category: Option<String>,
    pub script: Option<String>,
    pub bidi_class: Option<String>,
    pub canonical_combining_class: Option<i64>,
    pub decomposition: Option<String>,
    pub numeric_value: Option<String>,
    pub digit_value: Option<String>,
    pub decimal_digit_value: Option<String>,
    pub uppercase_mapping: Option<u32>,
    pub lowercase_mapping: Option<u32>,
    pub titlecase_mapping: Option<u32>,
    pub bidi_mirrored_glyph: Option<u32>,
    pub block: Option<String>,
    pub age: Option<String>,
    /// Flags that hold for this character; all others are stored as false
    pub flags: Vec<PropertyFlag>,
}

/// Insert or replace a character row / 写入字符
pub async fn insert_character(pool: &SqlitePool, character: &NewCharacter) -> Result<()> {
    if character.codepoint > MAX_CODEPOINT {
        return Err(ExplorerError::InvalidCodepoint(character.codepoint.to_string()));
    }

    let name_trigrams = character.name.as_deref().map(trigrams).unwrap_or_default();

    let mut columns = vec![
        "codepoint",
        "code",
        "name",
        "name_trigram_count",
        "general_category",
        "script",
        "bidi_class",
        "canonical_combining_class",
        "decomposition",
        "numeric_value",
        "digit_value",
        "decimal_digit_value",
        "uppercase_mapping",
        "lowercase_mapping",
        "titlecase_mapping",
        "bidi_mirrored_glyph",
        "block",
        "age",
    ];
    columns.extend(PropertyFlag::ALL.iter().map(|f| f.column_name()));

    let sql = format!(
        "INSERT OR REPLACE INTO characters ({}) VALUES ({})",
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let mut query = sqlx::query(&sql)
        .bind(i64::from(character.codepoint))
        .bind(format_code(character.codepoint))
        .bind(&character.name)
        .bind(name_trigrams.len() as i64)
        .bind(&character.general_category)
        .bind(&character.script)
        .bind(&character.bidi_class)
        .bind(character.canonical_combining_class)
        .bind(&character.decomposition)
        .bind(&character.numeric_value)
        .bind(&character.digit_value)
        .bind(&character.decimal_digit_value)
        .bind(character.uppercase_mapping.map(i64::from))
        .bind(character.lowercase_mapping.map(i64::from))
        .bind(character.titlecase_mapping.map(i64::from))
        .bind(character.bidi_mirrored_glyph.map(i64::from))
        .bind(&character.block)
        .bind(&character.age);
    for flag in PropertyFlag::ALL {
        query = query.bind(character.flags.contains(&flag));
    }

    let mut tx = pool.begin().await?;
    query.execute(&mut *tx).await?;

    sqlx::query("DELETE FROM name_trigrams WHERE codepoint = ?")
        .bind(i64::from(character.codepoint))
        .execute(&mut *tx)
        .await?;
    for trigram in &name_trigrams {
        sqlx::query("INSERT INTO name_trigrams (codepoint, trigram) VALUES (?, ?)")
            .bind(i64::from(character.codepoint))
            .bind(trigram)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Record that `codepoint` is confusable with `confusable_with` / 写入混淆对
/// Returns false when the pair already existed.
pub async fn insert_confusable(pool: &SqlitePool, codepoint: u32, confusable_with: u32) -> Result<bool> {
    if codepoint == confusable_with {
        return Err(ExplorerError::SelfConfusable(codepoint));
    }
    for cp in [codepoint, confusable_with] {
        if cp > MAX_CODEPOINT {
            return Err(ExplorerError::InvalidCodepoint(cp.to_string()));
        }
    }

    let result = sqlx::query(
        "INSERT OR IGNORE INTO confusables (codepoint, confusable_with) VALUES (?, ?)",
    )
    .bind(i64::from(codepoint))
    .bind(i64::from(confusable_with))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
