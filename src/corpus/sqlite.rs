//! SQLite-backed corpus store / SQLite 语料库实现

use async_trait::async_trait;
use sqlx::query::QueryAs;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;

use super::{CorpusStore, PageRequest, PAGE_SIZE};
use crate::error::Result;
use crate::filter::{CompiledQuery, SqlParam};
use crate::models::CharacterRow;

/// Columns of `CharacterRow`, including the mapped characters' names
const CHARACTER_COLUMNS: &str = r#"
    c.codepoint, c.code, c.name, c.general_category, c.script, c.bidi_class,
    c.canonical_combining_class, c.decomposition,
    c.numeric_value, c.digit_value, c.decimal_digit_value,
    c.uppercase_mapping, c.lowercase_mapping, c.titlecase_mapping, c.bidi_mirrored_glyph,
    c.block, c.age,
    c.alphabetic, c.white_space, c.dash, c.mirrored, c.math, c.cased,
    c.id_start, c.xid_start, c.xid_continue, c.id_continue,
    c.grapheme_base, c.grapheme_link, c.grapheme_extend, c.case_ignorable,
    c.changes_when_casefolded, c.changes_when_casemapped, c.changes_when_lowercased,
    c.changes_when_titlecased, c.changes_when_uppercased,
    c.default_ignorable_code_point, c.lowercase, c.uppercase,
    (SELECT u.name FROM characters u WHERE u.codepoint = c.uppercase_mapping) AS uppercase_name,
    (SELECT l.name FROM characters l WHERE l.codepoint = c.lowercase_mapping) AS lowercase_name,
    (SELECT t.name FROM characters t WHERE t.codepoint = c.titlecase_mapping) AS titlecase_name
"#;

#[derive(Clone)]
pub struct SqliteCorpusStore {
    db: SqlitePool,
}

impl SqliteCorpusStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn distinct_column(&self, column: &str) -> Result<Vec<String>> {
        // column names come from the fixed callers below
        let sql = format!(
            "SELECT DISTINCT {col} FROM characters WHERE {col} IS NOT NULL",
            col = column
        );
        Ok(sqlx::query_scalar(&sql).fetch_all(&self.db).await?)
    }
}

fn bind_params<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    params: &'q [SqlParam],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlParam::Int(value) => query.bind(*value),
            SqlParam::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

#[async_trait]
impl CorpusStore for SqliteCorpusStore {
    async fn count(&self, query: &CompiledQuery) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM characters c WHERE {}", query.predicate);
        let (count,): (i64,) = bind_params(sqlx::query_as(&sql), &query.params)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn fetch_page(&self, query: &CompiledQuery, request: &PageRequest) -> Result<Vec<CharacterRow>> {
        let (order_by, order_params) = query.order_by(request.sort, request.direction);
        let sql = format!(
            "SELECT {} FROM characters c WHERE {} {} LIMIT ? OFFSET ?",
            CHARACTER_COLUMNS, query.predicate, order_by
        );

        let mut params = query.params.clone();
        params.extend(order_params);
        params.push(SqlParam::Int(PAGE_SIZE));
        params.push(SqlParam::Int(request.offset()));

        let rows = bind_params(sqlx::query_as::<_, CharacterRow>(&sql), &params)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn resolve_name_by_codepoint(&self, codepoint: u32) -> Result<Option<String>> {
        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT name FROM characters WHERE codepoint = ?")
                .bind(i64::from(codepoint))
                .fetch_optional(&self.db)
                .await?;
        Ok(name.flatten())
    }

    async fn distinct_scripts(&self) -> Result<Vec<String>> {
        self.distinct_column("script").await
    }

    async fn distinct_categories(&self) -> Result<Vec<String>> {
        self.distinct_column("general_category").await
    }

    async fn distinct_classes(&self) -> Result<Vec<String>> {
        self.distinct_column("bidi_class").await
    }

    async fn distinct_versions(&self) -> Result<Vec<String>> {
        self.distinct_column("age").await
    }

    async fn distinct_decomposition_types(&self) -> Result<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT substr(decomposition, 2, instr(decomposition, '>') - 2)
            FROM characters
            WHERE decomposition LIKE '<%>%'
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(tags.into_iter().filter(|t| !t.is_empty()).collect())
    }

    async fn character(&self, codepoint: u32) -> Result<Option<CharacterRow>> {
        let sql = format!("SELECT {} FROM characters c WHERE c.codepoint = ?", CHARACTER_COLUMNS);
        let row = sqlx::query_as::<_, CharacterRow>(&sql)
            .bind(i64::from(codepoint))
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::corpus::writer::{insert_character, insert_confusable, NewCharacter};
    use crate::db::testing::memory_pool;
    use crate::filter::catalog::PropertyFlag;
    use crate::filter::{
        compile, parse_clauses, search_lookups, Compilation, FilterState, PropertyCatalog,
        SortDirection, SortKey,
    };

    fn ch(codepoint: u32, name: &str, category: &str, script: &str) -> NewCharacter {
        NewCharacter {
            codepoint,
            name: Some(name.to_string()),
            general_category: Some(category.to_string()),
            script: Some(script.to_string()),
            bidi_class: Some("L".to_string()),
            ..Default::default()
        }
    }

    async fn seeded_store() -> SqliteCorpusStore {
        let pool = memory_pool().await;
        let mut rows = vec![
            NewCharacter {
                flags: vec![PropertyFlag::Alphabetic, PropertyFlag::Uppercase],
                lowercase_mapping: Some(0x61),
                ..ch(0x41, "LATIN CAPITAL LETTER A", "Lu", "Latin")
            },
            NewCharacter {
                flags: vec![PropertyFlag::Alphabetic, PropertyFlag::Uppercase],
                ..ch(0x42, "LATIN CAPITAL LETTER B", "Lu", "Latin")
            },
            NewCharacter {
                flags: vec![PropertyFlag::Alphabetic, PropertyFlag::Lowercase],
                uppercase_mapping: Some(0x41),
                ..ch(0x61, "LATIN SMALL LETTER A", "Ll", "Latin")
            },
            NewCharacter {
                flags: vec![PropertyFlag::Dash],
                ..ch(0x2D, "HYPHEN-MINUS", "Pd", "Common")
            },
            NewCharacter {
                flags: vec![PropertyFlag::Alphabetic, PropertyFlag::Lowercase],
                ..ch(0x430, "CYRILLIC SMALL LETTER A", "Ll", "Cyrillic")
            },
            NewCharacter {
                decomposition: Some("<compat> 0020 0308".to_string()),
                ..ch(0xA8, "DIAERESIS", "Sk", "Common")
            },
            NewCharacter {
                decomposition: Some("0041 0300".to_string()),
                flags: vec![PropertyFlag::Alphabetic, PropertyFlag::Uppercase],
                ..ch(0xC0, "LATIN CAPITAL LETTER A WITH GRAVE", "Lu", "Latin")
            },
            NewCharacter {
                decomposition: Some("<font> 0041".to_string()),
                ..ch(0x1D400, "MATHEMATICAL BOLD CAPITAL A", "Lu", "Common")
            },
        ];
        // a run of same-category rows to exercise pagination
        for offset in 0..300u32 {
            rows.push(ch(0x4E00 + offset, "CJK UNIFIED IDEOGRAPH", "Lo", "Han"));
        }

        for row in &rows {
            insert_character(&pool, row).await.unwrap();
        }
        insert_confusable(&pool, 0x430, 0x61).await.unwrap();
        insert_confusable(&pool, 0x1D400, 0x41).await.unwrap();

        SqliteCorpusStore::new(pool)
    }

    async fn run(
        store: &SqliteCorpusStore,
        catalog: &PropertyCatalog,
        filters: &str,
        request: PageRequest,
    ) -> (i64, Vec<i64>) {
        let clauses = parse_clauses(filters).unwrap();
        let mut names = HashMap::new();
        for cp in search_lookups(&clauses) {
            if let Some(name) = store.resolve_name_by_codepoint(cp).await.unwrap() {
                names.insert(cp, name);
            }
        }
        match compile(&clauses, catalog, Some("user-1"), &names).unwrap() {
            Compilation::Empty => (0, Vec::new()),
            Compilation::Query(query) => {
                let page = store.count_and_fetch_page(&query, &request).await.unwrap();
                (page.total_count, page.rows.iter().map(|r| r.codepoint).collect())
            }
        }
    }

    #[tokio::test]
    async fn test_category_selection() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let (count, rows) = run(&store, &catalog, "categories:Lu", PageRequest::default()).await;
        assert_eq!(count, 4);
        assert_eq!(rows, vec![0x41, 0x42, 0xC0, 0x1D400]);

        let (count, rows) = run(&store, &catalog, "categories:Lu|Ll", PageRequest::default()).await;
        assert_eq!(count, 6);
        assert_eq!(rows, vec![0x41, 0x42, 0x61, 0xC0, 0x430, 0x1D400]);
    }

    #[tokio::test]
    async fn test_empty_and_full_selection() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let (count, rows) = run(&store, &catalog, "scripts:", PageRequest::default()).await;
        assert_eq!(count, 0);
        assert!(rows.is_empty());

        let all = catalog.values(crate::filter::Dimension::Scripts).join("|");
        let (full, _) = run(&store, &catalog, &format!("scripts:{}", all), PageRequest::default()).await;
        let (absent, _) = run(&store, &catalog, "", PageRequest::default()).await;
        assert_eq!(full, absent);
        assert_eq!(absent, 308);
    }

    #[tokio::test]
    async fn test_flags_and_negation() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let (count, rows) =
            run(&store, &catalog, "isAlphabetic,not_isDash,scripts:Latin", PageRequest::default()).await;
        assert_eq!(count, 4);
        assert_eq!(rows, vec![0x41, 0x42, 0x61, 0xC0]);

        let (count, _) = run(&store, &catalog, "isDash", PageRequest::default()).await;
        assert_eq!(count, 1);
        let (count, _) = run(&store, &catalog, "hasLowercaseMapping", PageRequest::default()).await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_confusable_partition() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let (total, _) = run(&store, &catalog, "", PageRequest::default()).await;
        let (with, with_rows) = run(&store, &catalog, "confusableWith:a", PageRequest::default()).await;
        let (without, _) = run(&store, &catalog, "notConfusableWith:a", PageRequest::default()).await;

        assert_eq!(with_rows, vec![0x430]);
        assert_eq!(with + without, total);

        // both directions of the relation match
        let (_, rows) = run(&store, &catalog, "confusableWith:а", PageRequest::default()).await;
        assert_eq!(rows, vec![0x61]);
        let (_, rows) = run(&store, &catalog, "confusableWith:Aа", PageRequest::default()).await;
        assert_eq!(rows, vec![0x61, 0x1D400]);
    }

    #[tokio::test]
    async fn test_decomposition_types() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();
        assert_eq!(
            catalog.values(crate::filter::Dimension::DecompositionTypes),
            ["canonical", "compat", "font"].map(String::from).as_slice()
        );

        let (_, rows) = run(&store, &catalog, "decompositionTypes:canonical", PageRequest::default()).await;
        assert_eq!(rows, vec![0xC0]);
        let (_, rows) =
            run(&store, &catalog, "decompositionTypes:compat|font", PageRequest::default()).await;
        assert_eq!(rows, vec![0xA8, 0x1D400]);
    }

    #[tokio::test]
    async fn test_repeated_dimension_keeps_first() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let input = "decompositionTypes:compat,decompositionTypes:canonical";
        let (_, rows) = run(&store, &catalog, input, PageRequest::default()).await;
        assert_eq!(rows, vec![0xA8]);

        // decoding keeps the same clause, so the normalized filter selects the same rows
        let normalized = FilterState::decode(input, &catalog).unwrap().encode(&catalog);
        let (_, normalized_rows) = run(&store, &catalog, &normalized, PageRequest::default()).await;
        assert_eq!(normalized_rows, rows);

        let (count, _) = run(&store, &catalog, "scripts:Latin,scripts:Greek", PageRequest::default()).await;
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_long_filter_lists_execute() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let ideographs: String = (0x4E00..0x4E00 + 1100u32).filter_map(char::from_u32).collect();
        let (with, rows) = run(
            &store,
            &catalog,
            &format!("confusableWith:a{}", ideographs),
            PageRequest::default(),
        )
        .await;
        assert_eq!(rows, vec![0x430]);
        let (without, _) = run(
            &store,
            &catalog,
            &format!("notConfusableWith:a{}", ideographs),
            PageRequest::default(),
        )
        .await;
        assert_eq!(with + without, 308);

        let mut tags: Vec<String> = (0..1100).map(|i| format!("tag{}", i)).collect();
        tags.push("compat".to_string());
        let (_, rows) = run(
            &store,
            &catalog,
            &format!("decompositionTypes:{}", tags.join("|")),
            PageRequest::default(),
        )
        .await;
        assert_eq!(rows, vec![0xA8]);
    }

    #[tokio::test]
    async fn test_decomposition_tag_wildcards_are_literal() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let (count, _) = run(&store, &catalog, "decompositionTypes:%", PageRequest::default()).await;
        assert_eq!(count, 0);
        let (count, _) = run(&store, &catalog, "decompositionTypes:f_nt", PageRequest::default()).await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_single_character_search_anchors_on_name() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();
        let request = PageRequest { sort: SortKey::Similarity, ..Default::default() };

        let (_, rows) = run(&store, &catalog, "search:A", request).await;
        assert_eq!(rows.first(), Some(&0x41));
        assert!(rows.contains(&0x42));
        assert!(!rows.contains(&0x2D));

        for hex in ["U+0041", "0x41", "41"] {
            let (_, rows) = run(&store, &catalog, &format!("search:{}", hex), request).await;
            assert_eq!(rows.first(), Some(&0x41), "search {}", hex);
        }
    }

    #[tokio::test]
    async fn test_search_matches_code() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let (_, rows) = run(&store, &catalog, "search:U+1D4", PageRequest::default()).await;
        assert_eq!(rows, vec![0x1D400]);
        let (_, rows) = run(&store, &catalog, "search:cyrillic small", PageRequest::default()).await;
        assert!(rows.contains(&0x430));
    }

    #[tokio::test]
    async fn test_pagination_is_exhaustive() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let first = PageRequest { page: 0, sort: SortKey::Script, direction };
            let (count, page0) = run(&store, &catalog, "", first).await;
            let (_, page1) = run(&store, &catalog, "", PageRequest { page: 1, ..first }).await;
            let (_, page2) = run(&store, &catalog, "", PageRequest { page: 2, ..first }).await;

            assert_eq!(page0.len(), 256);
            assert_eq!(page1.len() as i64, count - 256);
            assert!(page2.is_empty());

            let seen: HashSet<i64> = page0.iter().chain(page1.iter()).copied().collect();
            assert_eq!(seen.len() as i64, count);
        }
    }

    #[tokio::test]
    async fn test_tie_break_follows_direction() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();

        let request = PageRequest { sort: SortKey::Category, direction: SortDirection::Desc, page: 0 };
        let (_, rows) = run(&store, &catalog, "categories:Lu", request).await;
        assert_eq!(rows, vec![0x1D400, 0xC0, 0x42, 0x41]);

        let request = PageRequest { direction: SortDirection::Asc, ..request };
        let (_, rows) = run(&store, &catalog, "categories:Lu", request).await;
        assert_eq!(rows, vec![0x41, 0x42, 0xC0, 0x1D400]);
    }

    #[tokio::test]
    async fn test_similarity_ties_ascend_in_both_directions() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();
        let filters = "search:CJK UNIFIED IDEOGRAPH,scripts:Han";

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let first = PageRequest { page: 0, sort: SortKey::Similarity, direction };
            let (count, page0) = run(&store, &catalog, filters, first).await;
            let (_, page1) = run(&store, &catalog, filters, PageRequest { page: 1, ..first }).await;
            assert_eq!(count, 300);

            let expected: Vec<i64> = (0x4E00..0x4E00 + 300).collect();
            let rows: Vec<i64> = page0.into_iter().chain(page1).collect();
            assert_eq!(rows, expected, "{:?}", direction);
        }
    }

    #[tokio::test]
    async fn test_character_with_mapping_names() {
        let store = seeded_store().await;
        let row = store.character(0x41).await.unwrap().unwrap();
        assert_eq!(row.code, "U+0041");
        assert_eq!(row.lowercase_mapping, Some(0x61));
        assert_eq!(row.lowercase_name.as_deref(), Some("LATIN SMALL LETTER A"));
        assert_eq!(row.uppercase_name, None);

        assert!(store.character(0x10FFFF).await.unwrap().is_none());
        assert_eq!(store.resolve_name_by_codepoint(0x10FFFF).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_favorites_filter() {
        let store = seeded_store().await;
        let catalog = PropertyCatalog::load(&store).await.unwrap();
        sqlx::query("INSERT INTO users (id, google_id, created_at) VALUES ('user-1', 'g-1', '2024-01-01')")
            .execute(&store.db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO favorites (user_id, codepoint, created_at) VALUES ('user-1', 66, '2024-01-01')")
            .execute(&store.db)
            .await
            .unwrap();

        let (_, rows) = run(&store, &catalog, "favorited", PageRequest::default()).await;
        assert_eq!(rows, vec![0x42]);
        let (count, _) = run(&store, &catalog, "not_favorited", PageRequest::default()).await;
        assert_eq!(count, 307);
    }
}
