//! Filter query compiler / 筛选查询编译器
//!
//! Turns parsed clauses into one parameterized SQL predicate over the
//! `characters c` table. Only fixed fragments are ever written into the SQL
//! text; every value coming from the request is bound through a `?`.

use std::collections::{BTreeSet, HashMap};

use super::catalog::{Dimension, PropertyCatalog, PropertyTest, CANONICAL_DECOMPOSITION};
use super::codec::{first_selections, Clause};
use super::search::SearchTerm;
use super::trigram::{trigrams, SIMILARITY_THRESHOLD};
use crate::error::{ExplorerError, Result};

/// Bound value for a `?` placeholder / 绑定参数
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

/// Search anchor used for similarity ordering / 相似度排序锚点
#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    /// Text compared with character names (resolved name or raw term)
    pub anchor: String,
    trigrams: Vec<String>,
}

impl Similarity {
    fn new(anchor: String) -> Self {
        let trigrams = trigrams(&anchor).into_iter().collect();
        Self { anchor, trigrams }
    }

    /// SQL expression for the similarity of `c.name` to the anchor, with its params
    pub fn expression(&self) -> (String, Vec<SqlParam>) {
        if self.trigrams.is_empty() {
            return ("0.0".to_string(), Vec::new());
        }

        let shared = format!(
            "(SELECT COUNT(*) FROM name_trigrams t WHERE t.codepoint = c.codepoint AND t.trigram IN ({}))",
            placeholders(self.trigrams.len())
        );
        let sql = format!(
            "({shared} * 1.0 / (c.name_trigram_count + {n} - {shared}))",
            shared = shared,
            n = self.trigrams.len()
        );

        // `shared` appears twice
        let mut params = Vec::with_capacity(self.trigrams.len() * 2);
        for _ in 0..2 {
            params.extend(self.trigrams.iter().cloned().map(SqlParam::Text));
        }
        (sql, params)
    }
}

/// Ordering information produced alongside the predicate / 排序提示
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderHint {
    pub similarity: Option<Similarity>,
}

/// Compiled predicate ready for the corpus store / 编译后的查询
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Boolean expression over `c`, without the `WHERE` keyword
    pub predicate: String,
    pub params: Vec<SqlParam>,
    pub order_hint: OrderHint,
}

/// Outcome of compiling a filter / 编译结果
#[derive(Debug, Clone, PartialEq)]
pub enum Compilation {
    /// Known to match nothing; no query needs to run
    Empty,
    Query(CompiledQuery),
}

/// Sort column requested by the client / 排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Codepoint,
    Name,
    Script,
    Category,
    BidiClass,
    Block,
    Age,
    CombiningClass,
    Similarity,
}

impl SortKey {
    /// Unknown keys fall back to codepoint order / 未知字段按码位排序
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).unwrap_or_default() {
            "name" => SortKey::Name,
            "script" => SortKey::Script,
            "category" | "generalCategory" => SortKey::Category,
            "bidiClass" => SortKey::BidiClass,
            "block" => SortKey::Block,
            "age" | "version" => SortKey::Age,
            "combiningClass" => SortKey::CombiningClass,
            "similarity" => SortKey::Similarity,
            _ => SortKey::Codepoint,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortKey::Codepoint | SortKey::Similarity => "c.codepoint",
            SortKey::Name => "c.name",
            SortKey::Script => "c.script",
            SortKey::Category => "c.general_category",
            SortKey::BidiClass => "c.bidi_class",
            SortKey::Block => "c.block",
            SortKey::Age => "c.age",
            SortKey::CombiningClass => "c.canonical_combining_class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(d) if d.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl CompiledQuery {
    /// `ORDER BY` clause and its params / 生成排序子句
    ///
    /// Column sorts break ties on codepoint in the same direction. Similarity
    /// sorts order by distance, ties ascending by codepoint, and degrade to
    /// codepoint order when there is no search anchor.
    pub fn order_by(&self, sort: SortKey, direction: SortDirection) -> (String, Vec<SqlParam>) {
        let dir = direction.sql();
        match (sort, &self.order_hint.similarity) {
            (SortKey::Similarity, Some(similarity)) => {
                let (expr, params) = similarity.expression();
                (
                    format!("ORDER BY (1.0 - IFNULL({}, 0.0)) {}, c.codepoint ASC", expr, dir),
                    params,
                )
            }
            (SortKey::Codepoint, _) | (SortKey::Similarity, None) => {
                (format!("ORDER BY c.codepoint {}", dir), Vec::new())
            }
            (key, _) => (
                format!("ORDER BY {} {}, c.codepoint {}", key.column(), dir, dir),
                Vec::new(),
            ),
        }
    }
}

/// Codepoints whose names must be resolved before compiling / 需要预先解析名称的码位
pub fn search_lookups(clauses: &[Clause]) -> Vec<u32> {
    let mut codepoints: Vec<u32> = clauses
        .iter()
        .filter_map(|clause| match clause {
            Clause::Search(text) => SearchTerm::parse(text).and_then(|t| t.codepoint()),
            _ => None,
        })
        .collect();
    codepoints.sort_unstable();
    codepoints.dedup();
    codepoints
}

/// Compile clauses into a predicate / 编译筛选子句
///
/// `names` holds the names resolved for `search_lookups(clauses)`; a missing
/// entry means the codepoint has no name (or no row).
pub fn compile(
    clauses: &[Clause],
    catalog: &PropertyCatalog,
    user_id: Option<&str>,
    names: &HashMap<u32, String>,
) -> Result<Compilation> {
    let selections = first_selections(clauses);

    // An explicit empty selection matches nothing, whoever is asking
    if selections.iter().any(|(_, values)| values.is_empty()) {
        return Ok(Compilation::Empty);
    }

    let mut builder = PredicateBuilder::default();

    for (dimension, values) in selections {
        if !catalog.covers_all(dimension, values) {
            builder.members(dimension, values);
        }
    }

    for clause in clauses {
        match clause {
            Clause::ConfusableWith(text) => builder.confusable_with(text),
            Clause::NotConfusableWith(text) => builder.not_confusable_with(text),
            _ => {}
        }
    }

    for clause in clauses {
        if let Clause::Search(text) = clause {
            if let Some(term) = SearchTerm::parse(text) {
                builder.search(&term, names);
            }
        }
    }

    for clause in clauses {
        if let Clause::Property { test, negated } = clause {
            builder.property(*test, *negated, user_id)?;
        }
    }

    let query = builder.finish();
    tracing::debug!(
        "Compiled filter predicate: {} ({} params)",
        query.predicate,
        query.params.len()
    );
    Ok(Compilation::Query(query))
}

#[derive(Default)]
struct PredicateBuilder {
    where_clauses: Vec<String>,
    params: Vec<SqlParam>,
    similarity: Option<Similarity>,
}

impl PredicateBuilder {
    fn finish(self) -> CompiledQuery {
        let predicate = if self.where_clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            self.where_clauses.join(" AND ")
        };
        CompiledQuery {
            predicate,
            params: self.params,
            order_hint: OrderHint { similarity: self.similarity },
        }
    }

    fn members(&mut self, dimension: Dimension, values: &[String]) {
        let values: BTreeSet<&str> = values.iter().map(String::as_str).collect();

        if dimension == Dimension::DecompositionTypes {
            let tags: Vec<&str> = values
                .iter()
                .copied()
                .filter(|v| *v != CANONICAL_DECOMPOSITION)
                .collect();

            let mut alternatives = Vec::with_capacity(2);
            if values.contains(CANONICAL_DECOMPOSITION) {
                alternatives
                    .push("(c.decomposition IS NOT NULL AND c.decomposition NOT LIKE '<%')".to_string());
            }
            if !tags.is_empty() {
                // tag between the leading `<` and the first `>`
                alternatives.push(format!(
                    "(c.decomposition LIKE '<%' AND \
                     substr(c.decomposition, 2, instr(c.decomposition, '>') - 2) IN ({}))",
                    placeholders(tags.len())
                ));
                self.params
                    .extend(tags.into_iter().map(|t| SqlParam::Text(t.to_string())));
            }
            self.where_clauses.push(format!("({})", alternatives.join(" OR ")));
            return;
        }

        self.where_clauses.push(format!(
            "{} IN ({})",
            dimension.column(),
            placeholders(values.len())
        ));
        self.params
            .extend(values.into_iter().map(|v| SqlParam::Text(v.to_string())));
    }

    /// Characters confusable with any unit of `text` / 与任一字符混淆
    fn confusable_with(&mut self, text: &str) {
        let units = scalar_values(text);
        if units.is_empty() {
            return;
        }
        let list = placeholders(units.len());
        self.where_clauses.push(format!(
            "(c.codepoint IN (SELECT codepoint FROM confusables WHERE confusable_with IN ({list})) \
             OR c.codepoint IN (SELECT confusable_with FROM confusables WHERE codepoint IN ({list})))",
            list = list
        ));
        self.push_units(&units);
    }

    /// Characters confusable with none of the units of `text` / 不与任何字符混淆
    fn not_confusable_with(&mut self, text: &str) {
        let units = scalar_values(text);
        if units.is_empty() {
            return;
        }
        let list = placeholders(units.len());
        self.where_clauses.push(format!(
            "(c.codepoint NOT IN (SELECT codepoint FROM confusables WHERE confusable_with IN ({list})) \
             AND c.codepoint NOT IN (SELECT confusable_with FROM confusables WHERE codepoint IN ({list})))",
            list = list
        ));
        self.push_units(&units);
    }

    // both lists bind the same units
    fn push_units(&mut self, units: &BTreeSet<u32>) {
        for _ in 0..2 {
            self.params
                .extend(units.iter().map(|u| SqlParam::Int(i64::from(*u))));
        }
    }

    fn search(&mut self, term: &SearchTerm, names: &HashMap<u32, String>) {
        let resolved = term.codepoint().and_then(|cp| names.get(&cp));

        let similarity = Similarity::new(
            resolved.cloned().unwrap_or_else(|| term.text().to_string()),
        );
        let (expr, params) = similarity.expression();
        self.params.extend(params);

        let fragment = if resolved.is_some() {
            format!("{} >= {}", expr, SIMILARITY_THRESHOLD)
        } else {
            self.params
                .push(SqlParam::Text(format!("%{}%", escape_like(term.text()))));
            format!("({} >= {} OR c.code LIKE ? ESCAPE '\\')", expr, SIMILARITY_THRESHOLD)
        };

        self.where_clauses.push(fragment);
        self.similarity = Some(similarity);
    }

    fn property(&mut self, test: PropertyTest, negated: bool, user_id: Option<&str>) -> Result<()> {
        let fragment = match test {
            PropertyTest::Flag(flag) => {
                let col = flag.column();
                if negated {
                    format!("({} IS NULL OR {} != 1)", col, col)
                } else {
                    format!("{} = 1", col)
                }
            }
            PropertyTest::Present(presence) => {
                let col = presence.column();
                if negated {
                    format!("{} IS NULL", col)
                } else {
                    format!("{} IS NOT NULL", col)
                }
            }
            PropertyTest::CombiningClass => pick(
                negated,
                "c.canonical_combining_class > 0",
                "(c.canonical_combining_class IS NULL OR c.canonical_combining_class = 0)",
            ),
            PropertyTest::Mirror => pick(
                negated,
                "c.bidi_mirrored_glyph IS NOT NULL",
                "c.bidi_mirrored_glyph IS NULL",
            ),
            PropertyTest::Titlecase => pick(
                negated,
                "c.general_category = 'Lt'",
                "(c.general_category IS NULL OR c.general_category != 'Lt')",
            ),
            PropertyTest::Favorited => {
                let user_id = user_id.ok_or_else(|| {
                    let key = PropertyCatalog::key_of(test);
                    let key = if negated { format!("not_{}", key) } else { key.to_string() };
                    ExplorerError::AuthRequired(key)
                })?;
                self.params.push(SqlParam::Text(user_id.to_string()));
                let membership = if negated { "NOT IN" } else { "IN" };
                format!(
                    "c.codepoint {} (SELECT f.codepoint FROM favorites f WHERE f.user_id = ?)",
                    membership
                )
            }
        };

        self.where_clauses.push(fragment);
        Ok(())
    }
}

fn pick(negated: bool, require: &str, exclude: &str) -> String {
    if negated { exclude } else { require }.to_string()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn scalar_values(text: &str) -> BTreeSet<u32> {
    text.trim().chars().map(u32::from).collect()
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::codec::parse_clauses;

    fn catalog() -> PropertyCatalog {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        PropertyCatalog::new(
            s(&["Cyrillic", "Greek", "Latin"]),
            s(&["Ll", "Lu", "Nd"]),
            s(&["AN", "L", "R"]),
            s(&["1.1", "2.0"]),
            s(&["compat", "font"]),
        )
    }

    fn compile_str(input: &str, user: Option<&str>) -> Result<Compilation> {
        let clauses = parse_clauses(input)?;
        compile(&clauses, &catalog(), user, &HashMap::new())
    }

    fn query(input: &str) -> CompiledQuery {
        match compile_str(input, Some("user-1")).unwrap() {
            Compilation::Query(q) => q,
            Compilation::Empty => panic!("unexpected empty compilation for {}", input),
        }
    }

    #[test]
    fn test_no_clauses() {
        let q = query("");
        assert_eq!(q.predicate, "1 = 1");
        assert!(q.params.is_empty());
        assert_eq!(q.order_hint, OrderHint::default());
    }

    #[test]
    fn test_flag_require_and_exclude() {
        let q = query("isAlphabetic,not_isDash");
        assert_eq!(q.predicate, "c.alphabetic = 1 AND (c.dash IS NULL OR c.dash != 1)");
        assert!(q.params.is_empty());
    }

    #[test]
    fn test_presence_and_special_tests() {
        let q = query("hasName,not_hasCombiningClass,hasMirror,not_isTitlecase");
        assert_eq!(
            q.predicate,
            "c.name IS NOT NULL \
             AND (c.canonical_combining_class IS NULL OR c.canonical_combining_class = 0) \
             AND c.bidi_mirrored_glyph IS NOT NULL \
             AND (c.general_category IS NULL OR c.general_category != 'Lt')"
        );
    }

    #[test]
    fn test_members_in_list() {
        let q = query("categories:Lu|Ll,scripts:Latin");
        assert_eq!(q.predicate, "c.general_category IN (?, ?) AND c.script IN (?)");
        assert_eq!(
            q.params,
            vec![
                SqlParam::Text("Ll".into()),
                SqlParam::Text("Lu".into()),
                SqlParam::Text("Latin".into()),
            ]
        );

        let q = query("categories:Lu|Lu|Ll");
        assert_eq!(q.predicate, "c.general_category IN (?, ?)");
    }

    #[test]
    fn test_repeated_dimension_keeps_first() {
        let q = query("scripts:Latin,scripts:Greek");
        assert_eq!(q.predicate, "c.script IN (?)");
        assert_eq!(q.params, vec![SqlParam::Text("Latin".into())]);

        // a later empty selection does not empty the result
        let q = query("scripts:Latin,scripts:");
        assert_eq!(q.predicate, "c.script IN (?)");
        assert_eq!(compile_str("scripts:,scripts:Latin", None).unwrap(), Compilation::Empty);
    }

    #[test]
    fn test_full_selection_is_absent() {
        let q = query("categories:Lu|Ll|Nd");
        assert_eq!(q.predicate, "1 = 1");
        assert!(q.params.is_empty());
    }

    #[test]
    fn test_empty_selection_short_circuits_before_auth() {
        assert_eq!(compile_str("scripts:", None).unwrap(), Compilation::Empty);
        assert_eq!(compile_str("favorited,versions:", None).unwrap(), Compilation::Empty);
    }

    #[test]
    fn test_decomposition_types() {
        let q = query("decompositionTypes:canonical|font");
        assert_eq!(
            q.predicate,
            "((c.decomposition IS NOT NULL AND c.decomposition NOT LIKE '<%') OR \
             (c.decomposition LIKE '<%' AND \
             substr(c.decomposition, 2, instr(c.decomposition, '>') - 2) IN (?)))"
        );
        assert_eq!(q.params, vec![SqlParam::Text("font".into())]);

        // tags are bound as plain values, wildcards included
        let q = query("decompositionTypes:f%nt|font|f_nt");
        assert_eq!(q.predicate.matches('?').count(), 3);
        assert!(!q.predicate.contains("NOT LIKE"));
        assert_eq!(
            q.params,
            vec![
                SqlParam::Text("f%nt".into()),
                SqlParam::Text("f_nt".into()),
                SqlParam::Text("font".into()),
            ]
        );
    }

    #[test]
    fn test_long_tag_list_stays_flat() {
        let tags: Vec<String> = (0..1100).map(|i| format!("tag{}", i)).collect();
        let q = query(&format!("decompositionTypes:{}", tags.join("|")));
        assert_eq!(q.params.len(), 1100);
        assert_eq!(q.predicate.matches(" OR ").count(), 0);
    }

    #[test]
    fn test_favorited_requires_user() {
        let err = compile_str("favorited", None).unwrap_err();
        assert!(matches!(err, ExplorerError::AuthRequired(ref key) if key == "favorited"));
        let err = compile_str("not_favorited", None).unwrap_err();
        assert!(matches!(err, ExplorerError::AuthRequired(ref key) if key == "not_favorited"));

        let q = query("not_favorited");
        assert_eq!(
            q.predicate,
            "c.codepoint NOT IN (SELECT f.codepoint FROM favorites f WHERE f.user_id = ?)"
        );
        assert_eq!(q.params, vec![SqlParam::Text("user-1".into())]);
    }

    #[test]
    fn test_confusables_flat_lists() {
        let q = query("confusableWith:aba");
        assert_eq!(
            q.predicate,
            "(c.codepoint IN (SELECT codepoint FROM confusables WHERE confusable_with IN (?, ?)) \
             OR c.codepoint IN (SELECT confusable_with FROM confusables WHERE codepoint IN (?, ?)))"
        );
        assert_eq!(
            q.params,
            vec![SqlParam::Int(97), SqlParam::Int(98), SqlParam::Int(97), SqlParam::Int(98)]
        );

        let q = query("notConfusableWith:ab");
        assert_eq!(q.predicate.matches("NOT IN").count(), 2);
        assert_eq!(q.params.len(), 4);

        assert_eq!(query("confusableWith:  ").predicate, "1 = 1");
        assert_eq!(query("notConfusableWith:  ").predicate, "1 = 1");
    }

    #[test]
    fn test_long_confusable_text_stays_flat() {
        let text: String = (0x4E00..0x4E00 + 1100u32).filter_map(char::from_u32).collect();
        for key in ["confusableWith", "notConfusableWith"] {
            let q = query(&format!("{}:{}", key, text));
            assert_eq!(q.params.len(), 2200);
            assert_eq!(q.predicate.matches("SELECT").count(), 2);
        }
    }

    #[test]
    fn test_fragment_order() {
        let q = query("isDash,search:zz,confusableWith:o,scripts:Latin");
        let members = q.predicate.find("c.script IN").unwrap();
        let confusable = q.predicate.find("confusables").unwrap();
        let search = q.predicate.find("name_trigrams").unwrap();
        let flag = q.predicate.find("c.dash = 1").unwrap();
        assert!(members < confusable && confusable < search && search < flag);
        assert_eq!(q.params.first(), Some(&SqlParam::Text("Latin".into())));
    }

    #[test]
    fn test_search_raw_term() {
        let q = query("search:lat");
        let similarity = q.order_hint.similarity.clone().unwrap();
        assert_eq!(similarity.anchor, "lat");
        assert!(q.predicate.contains("c.code LIKE ?"));
        // 4 trigrams, bound twice, then the LIKE pattern
        assert_eq!(q.params.len(), 9);
        assert_eq!(q.params.last(), Some(&SqlParam::Text("%lat%".into())));
    }

    #[test]
    fn test_search_resolved_codepoint() {
        let clauses = parse_clauses("search:U+0041").unwrap();
        assert_eq!(search_lookups(&clauses), vec![65]);

        let mut names = HashMap::new();
        names.insert(65, "LATIN CAPITAL LETTER A".to_string());
        let q = match compile(&clauses, &catalog(), None, &names).unwrap() {
            Compilation::Query(q) => q,
            Compilation::Empty => panic!("unexpected empty"),
        };
        assert_eq!(q.order_hint.similarity.unwrap().anchor, "LATIN CAPITAL LETTER A");
        assert!(!q.predicate.contains("LIKE"));
    }

    #[test]
    fn test_search_unresolved_codepoint_falls_back() {
        let q = query("search:0x41");
        assert_eq!(q.order_hint.similarity.unwrap().anchor, "0x41");
        assert!(q.predicate.contains("c.code LIKE ?"));
    }

    #[test]
    fn test_search_without_trigrams() {
        let q = query("search:%%");
        assert!(q.predicate.starts_with("(0.0 >= 0.3 OR c.code LIKE ?"));
        assert_eq!(q.params, vec![SqlParam::Text("%\\%\\%%".into())]);
    }

    #[test]
    fn test_search_lookups() {
        let clauses = parse_clauses("search:a,isDash,search:latin").unwrap();
        assert_eq!(search_lookups(&clauses), vec![97]);
        assert!(search_lookups(&parse_clauses("search:  ").unwrap()).is_empty());
    }

    #[test]
    fn test_order_by() {
        let plain = query("");
        assert_eq!(
            plain.order_by(SortKey::Codepoint, SortDirection::Desc).0,
            "ORDER BY c.codepoint DESC"
        );
        assert_eq!(
            plain.order_by(SortKey::Name, SortDirection::Desc).0,
            "ORDER BY c.name DESC, c.codepoint DESC"
        );
        // no anchor: similarity degrades to codepoint
        assert_eq!(
            plain.order_by(SortKey::Similarity, SortDirection::Asc),
            ("ORDER BY c.codepoint ASC".to_string(), Vec::new())
        );

        let searched = query("search:cat");
        let (sql, params) = searched.order_by(SortKey::Similarity, SortDirection::Asc);
        assert!(sql.starts_with("ORDER BY (1.0 - IFNULL("));
        assert!(sql.ends_with("ASC, c.codepoint ASC"));
        assert_eq!(params.len(), 8);

        // ties stay ascending when distance is sorted descending
        let (sql, _) = searched.order_by(SortKey::Similarity, SortDirection::Desc);
        assert!(sql.ends_with(") DESC, c.codepoint ASC"));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(SortKey::parse(None), SortKey::Codepoint);
        assert_eq!(SortKey::parse(Some("unicodeId")), SortKey::Codepoint);
        assert_eq!(SortKey::parse(Some("bogus")), SortKey::Codepoint);
        assert_eq!(SortKey::parse(Some("similarity")), SortKey::Similarity);
        assert_eq!(SortKey::parse(Some("bidiClass")), SortKey::BidiClass);
        assert_eq!(SortDirection::parse(Some("DESC")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(None), SortDirection::Asc);
    }
}
