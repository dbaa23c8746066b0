//! Character corpus access / 字符语料库访问

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{CompiledQuery, SortDirection, SortKey};
use crate::models::CharacterRow;

pub mod sqlite;
pub mod writer;

pub use sqlite::SqliteCorpusStore;
pub use writer::{insert_character, insert_confusable, NewCharacter};

/// Rows per result page / 每页条数
pub const PAGE_SIZE: i64 = 256;

/// Which page of a compiled query to fetch, and in what order / 分页请求
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * PAGE_SIZE
    }
}

/// One page of rows plus the total match count / 分页结果
#[derive(Debug, Clone, Default)]
pub struct CorpusPage {
    pub rows: Vec<CharacterRow>,
    pub total_count: i64,
}

/// Read side of the character corpus / 语料库读取接口
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Number of rows matching the predicate / 匹配总数
    async fn count(&self, query: &CompiledQuery) -> Result<i64>;

    /// One sorted page of matching rows / 获取一页
    async fn fetch_page(&self, query: &CompiledQuery, request: &PageRequest) -> Result<Vec<CharacterRow>>;

    /// Count and page for the same compiled query, run concurrently / 并发统计与分页
    async fn count_and_fetch_page(
        &self,
        query: &CompiledQuery,
        request: &PageRequest,
    ) -> Result<CorpusPage> {
        let (total_count, rows) =
            tokio::try_join!(self.count(query), self.fetch_page(query, request))?;
        Ok(CorpusPage { rows, total_count })
    }

    /// Name of a codepoint, `None` when the row or the name is missing / 查询码位名称
    async fn resolve_name_by_codepoint(&self, codepoint: u32) -> Result<Option<String>>;

    async fn distinct_scripts(&self) -> Result<Vec<String>>;

    async fn distinct_categories(&self) -> Result<Vec<String>>;

    async fn distinct_classes(&self) -> Result<Vec<String>>;

    async fn distinct_versions(&self) -> Result<Vec<String>>;

    /// Bracketed decomposition tags in use, without `canonical` / 分解类型标签
    async fn distinct_decomposition_types(&self) -> Result<Vec<String>>;

    /// Single character row / 单个字符
    async fn character(&self, codepoint: u32) -> Result<Option<CharacterRow>>;
}
