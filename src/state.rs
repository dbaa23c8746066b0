use sqlx::SqlitePool;
use std::sync::Arc;
use unicode_explorer_backend::corpus::CorpusStore;
use unicode_explorer_backend::favorites::FavoriteStore;
use unicode_explorer_backend::filter::PropertyCatalog;

/// Shared application state / 应用共享状态
pub struct AppState {
    pub db: SqlitePool,
    /// Character corpus (read-only) / 字符语料库
    pub corpus: Arc<dyn CorpusStore>,
    /// Dimension values loaded at startup, never mutated / 启动时加载的属性目录
    pub catalog: Arc<PropertyCatalog>,
    pub favorites: FavoriteStore,
    /// Client for the identity provider / 身份提供方HTTP客户端
    pub http: reqwest::Client,
}
