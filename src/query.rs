//! Character query pipeline: decode, compile, execute, assemble / 字符查询流程

use std::collections::HashMap;

use crate::assembler::assemble;
use crate::corpus::{CorpusStore, PageRequest};
use crate::error::{ExplorerError, Result};
use crate::filter::{compile, parse_clauses, search_lookups, Compilation, PropertyCatalog};
use crate::models::CharacterRecord;

/// One page of assembled records / 查询结果页
#[derive(Debug, Clone, Default)]
pub struct CharacterPage {
    pub characters: Vec<CharacterRecord>,
    pub total_count: i64,
}

/// Run a filter string against the corpus / 执行筛选查询
pub async fn query_characters<S: CorpusStore + ?Sized>(
    store: &S,
    catalog: &PropertyCatalog,
    filters: &str,
    user_id: Option<&str>,
    request: PageRequest,
) -> Result<CharacterPage> {
    let clauses = parse_clauses(filters)?;

    let mut names = HashMap::new();
    for codepoint in search_lookups(&clauses) {
        if let Some(name) = store.resolve_name_by_codepoint(codepoint).await? {
            names.insert(codepoint, name);
        }
    }

    let query = match compile(&clauses, catalog, user_id, &names)? {
        Compilation::Empty => return Ok(CharacterPage::default()),
        Compilation::Query(query) => query,
    };

    let page = store.count_and_fetch_page(&query, &request).await?;
    Ok(CharacterPage {
        characters: page.rows.into_iter().map(assemble).collect(),
        total_count: page.total_count,
    })
}

/// Single character record / 查询单个字符
pub async fn lookup_character<S: CorpusStore + ?Sized>(store: &S, codepoint: u32) -> Result<CharacterRecord> {
    store
        .character(codepoint)
        .await?
        .map(assemble)
        .ok_or(ExplorerError::NotFound(codepoint))
}
