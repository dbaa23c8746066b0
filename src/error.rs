//! Error taxonomy for the character explorer / 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    /// Filter clause that does not resolve in the property catalog / 未知筛选条件
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    /// Favorites filter used without a logged-in user / 需要登录
    #[error("Authentication required for filter: {0}")]
    AuthRequired(String),

    #[error("Invalid codepoint: {0}")]
    InvalidCodepoint(String),

    /// Confusable pair whose two sides are the same codepoint / 自身混淆对
    #[error("Codepoint {0} cannot be confusable with itself")]
    SelfConfusable(u32),

    #[error("Character not found: {0}")]
    NotFound(u32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ExplorerError {
    /// Whether the failure was caused by the request rather than the server / 是否为客户端错误
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExplorerError::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
