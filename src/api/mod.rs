pub mod characters;
pub mod favorites;
pub mod oauth;
pub mod server;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use unicode_explorer_backend::ExplorerError;

pub type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Generic 500 body; details stay in the log / 服务器内部错误
pub fn internal_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
}

/// Map a library error onto an HTTP error body / 错误映射
pub fn api_error(err: ExplorerError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        ExplorerError::UnknownFilter(_)
        | ExplorerError::InvalidCodepoint(_)
        | ExplorerError::SelfConfusable(_) => StatusCode::BAD_REQUEST,
        ExplorerError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
        ExplorerError::NotFound(_) => StatusCode::NOT_FOUND,
        ExplorerError::Database(e) => {
            tracing::error!("Database error: {}", e);
            return internal_error();
        }
    };

    if err.is_client_error() {
        tracing::warn!("Rejected request: {}", err);
    }

    let message = match &err {
        ExplorerError::NotFound(_) => "Character not found".to_string(),
        ExplorerError::InvalidCodepoint(_) => "Invalid codepoint".to_string(),
        other => other.to_string(),
    };
    (status, Json(json!({"error": message})))
}
