//! Filter expression codec / 筛选表达式编解码
//!
//! The filter string travels in the `filters` URL parameter so that views are
//! shareable. Grammar (comma separated clauses, implicit AND):
//!
//! ```text
//! clause := propertyKey | "not_" propertyKey
//!         | dimensionPrefix ":" value ("|" value)*
//!         | "search:" text | "confusableWith:" text | "notConfusableWith:" text
//! ```
//!
//! Free text is not escaped: a `,` inside search text splits the clause. This is
//! a compact encoding, not a general one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::{Dimension, PropertyCatalog, PropertyTest};
use crate::error::{ExplorerError, Result};

const SEARCH_PREFIX: &str = "search";
const CONFUSABLE_PREFIX: &str = "confusableWith";
const NOT_CONFUSABLE_PREFIX: &str = "notConfusableWith";
const NEGATION_PREFIX: &str = "not_";

/// Tri-state property toggle / 三态开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    #[default]
    Unset,
    Require,
    Exclude,
}

/// One parsed filter clause / 单个筛选子句
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Bare key (require) or `not_` key (exclude)
    Property { test: PropertyTest, negated: bool },
    /// `prefix:v1|v2`; an empty list is a valid "select none"
    Members { dimension: Dimension, values: Vec<String> },
    Search(String),
    ConfusableWith(String),
    NotConfusableWith(String),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Property { test, negated } => {
                if *negated {
                    f.write_str(NEGATION_PREFIX)?;
                }
                f.write_str(PropertyCatalog::key_of(*test))
            }
            Clause::Members { dimension, values } => {
                write!(f, "{}:{}", dimension.prefix(), values.join("|"))
            }
            Clause::Search(text) => write!(f, "{}:{}", SEARCH_PREFIX, text),
            Clause::ConfusableWith(text) => write!(f, "{}:{}", CONFUSABLE_PREFIX, text),
            Clause::NotConfusableWith(text) => write!(f, "{}:{}", NOT_CONFUSABLE_PREFIX, text),
        }
    }
}

/// Parse a filter string into clauses / 解析筛选串
/// Any clause that does not parse aborts the whole expression.
pub fn parse_clauses(input: &str) -> Result<Vec<Clause>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(parse_clause)
        .collect()
}

fn parse_clause(raw: &str) -> Result<Clause> {
    if let Some((prefix, rest)) = raw.split_once(':') {
        if let Some(dimension) = Dimension::from_prefix(prefix) {
            return Ok(Clause::Members {
                dimension,
                values: split_values(rest),
            });
        }
        match prefix {
            SEARCH_PREFIX => return Ok(Clause::Search(rest.to_string())),
            CONFUSABLE_PREFIX => return Ok(Clause::ConfusableWith(rest.to_string())),
            NOT_CONFUSABLE_PREFIX => return Ok(Clause::NotConfusableWith(rest.to_string())),
            _ => {}
        }
    }

    let (key, negated) = match raw.strip_prefix(NEGATION_PREFIX) {
        Some(key) => (key, true),
        None => (raw, false),
    };
    let test = PropertyCatalog::resolve(key)
        .ok_or_else(|| ExplorerError::UnknownFilter(raw.to_string()))?;
    Ok(Clause::Property { test, negated })
}

fn split_values(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join clauses back into a filter string / 拼接筛选串
pub fn render_clauses(clauses: &[Clause]) -> String {
    clauses
        .iter()
        .map(Clause::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// First selection of each dimension; repeated dimension clauses are ignored / 每个维度取首个选择
pub fn first_selections(clauses: &[Clause]) -> Vec<(Dimension, &[String])> {
    let mut seen = BTreeSet::new();
    clauses
        .iter()
        .filter_map(|clause| match clause {
            Clause::Members { dimension, values } if seen.insert(*dimension) => {
                Some((*dimension, values.as_slice()))
            }
            _ => None,
        })
        .collect()
}

/// Client-side filter state / 客户端筛选状态
///
/// Every dimension always holds a selection; a fresh state selects every
/// known value, which encodes to "no clause".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    toggles: HashMap<PropertyTest, Toggle>,
    selections: BTreeMap<Dimension, BTreeSet<String>>,
    search: String,
    confusable_with: String,
    not_confusable_with: String,
}

impl FilterState {
    /// Default state: nothing toggled, everything selected / 默认状态
    pub fn new(catalog: &PropertyCatalog) -> Self {
        let selections = Dimension::ALL
            .into_iter()
            .map(|d| (d, catalog.values(d).iter().cloned().collect()))
            .collect();

        Self {
            toggles: HashMap::new(),
            selections,
            search: String::new(),
            confusable_with: String::new(),
            not_confusable_with: String::new(),
        }
    }

    /// Decode a filter string / 解码筛选串
    pub fn decode(input: &str, catalog: &PropertyCatalog) -> Result<Self> {
        let clauses = parse_clauses(input)?;
        let mut state = Self::new(catalog);
        for (dimension, values) in first_selections(&clauses) {
            state.select(dimension, values.iter().cloned());
        }
        for clause in clauses {
            if !matches!(clause, Clause::Members { .. }) {
                state.apply(clause);
            }
        }
        Ok(state)
    }

    /// Encode to a filter string / 编码为筛选串
    pub fn encode(&self, catalog: &PropertyCatalog) -> String {
        render_clauses(&self.to_clauses(catalog))
    }

    fn apply(&mut self, clause: Clause) {
        match clause {
            Clause::Property { test, negated } => {
                let toggle = if negated { Toggle::Exclude } else { Toggle::Require };
                self.toggles.insert(test, toggle);
            }
            Clause::Members { dimension, values } => self.select(dimension, values),
            Clause::Search(text) => self.set_search(&text),
            Clause::ConfusableWith(text) => self.set_confusable_with(&text),
            Clause::NotConfusableWith(text) => self.set_not_confusable_with(&text),
        }
    }

    /// Clauses this state stands for, in canonical order / 转换为子句列表
    pub fn to_clauses(&self, catalog: &PropertyCatalog) -> Vec<Clause> {
        let mut clauses = Vec::new();

        for key in PropertyCatalog::property_keys() {
            let Some(test) = PropertyCatalog::resolve(key) else { continue };
            match self.toggle(test) {
                Toggle::Require => clauses.push(Clause::Property { test, negated: false }),
                Toggle::Exclude => clauses.push(Clause::Property { test, negated: true }),
                Toggle::Unset => {}
            }
        }

        for (dimension, selected) in &self.selections {
            let known = catalog.values(*dimension);
            let is_full = known.iter().all(|v| selected.contains(v))
                && selected.is_empty() == known.is_empty();
            if !is_full {
                clauses.push(Clause::Members {
                    dimension: *dimension,
                    values: selected.iter().cloned().collect(),
                });
            }
        }

        if !self.search.is_empty() {
            clauses.push(Clause::Search(self.search.clone()));
        }
        if !self.confusable_with.is_empty() {
            clauses.push(Clause::ConfusableWith(self.confusable_with.clone()));
        }
        if !self.not_confusable_with.is_empty() {
            clauses.push(Clause::NotConfusableWith(self.not_confusable_with.clone()));
        }

        clauses
    }

    pub fn toggle(&self, test: PropertyTest) -> Toggle {
        self.toggles.get(&test).copied().unwrap_or_default()
    }

    pub fn set_toggle(&mut self, test: PropertyTest, toggle: Toggle) {
        if toggle == Toggle::Unset {
            self.toggles.remove(&test);
        } else {
            self.toggles.insert(test, toggle);
        }
    }

    pub fn selection(&self, dimension: Dimension) -> &BTreeSet<String> {
        // every dimension is inserted by `new`
        &self.selections[&dimension]
    }

    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(dimension, values.into_iter().map(Into::into).collect());
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, text: &str) {
        self.search = text.trim().to_string();
    }

    pub fn confusable_with(&self) -> &str {
        &self.confusable_with
    }

    pub fn set_confusable_with(&mut self, text: &str) {
        self.confusable_with = text.trim().to_string();
    }

    pub fn not_confusable_with(&self) -> &str {
        &self.not_confusable_with
    }

    pub fn set_not_confusable_with(&mut self, text: &str) {
        self.not_confusable_with = text.trim().to_string();
    }
}
