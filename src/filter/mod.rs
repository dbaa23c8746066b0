//! Filter expressions: catalog, wire codec and SQL compiler / 筛选表达式

pub mod catalog;
pub mod codec;
pub mod compiler;
pub mod search;
pub mod trigram;

pub use catalog::{Dimension, PropertyCatalog, PropertyTest};
pub use codec::{first_selections, parse_clauses, render_clauses, Clause, FilterState, Toggle};
pub use compiler::{
    compile, search_lookups, Compilation, CompiledQuery, SortDirection, SortKey, SqlParam,
};
