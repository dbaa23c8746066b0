use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_cookies::Cookies;

use unicode_explorer_backend::utils::{parse_codepoint_param, MAX_CODEPOINT};

use crate::api::{api_error, ApiResult};
use crate::auth::require_user;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub codepoint: Option<i64>,
}

/// GET /api/favorites - 当前用户的收藏码位
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> ApiResult {
    let user = require_user(&cookies, &state.db).await?;
    let favorites = state.favorites.list(&user.id).await.map_err(api_error)?;
    Ok(Json(json!({ "favorites": favorites })))
}

/// POST /api/favorites - 添加收藏（重复添加不报错）
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(req): Json<AddFavoriteRequest>,
) -> ApiResult {
    let user = require_user(&cookies, &state.db).await?;

    let codepoint = req
        .codepoint
        .ok_or_else(|| (StatusCode::BAD_REQUEST, Json(json!({"error": "Codepoint is required"}))))?;
    let codepoint = u32::try_from(codepoint)
        .ok()
        .filter(|cp| *cp <= MAX_CODEPOINT)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid codepoint"}))))?;

    let added = state.favorites.add(&user.id, codepoint).await.map_err(api_error)?;
    Ok(Json(json!({
        "success": true,
        "added": added,
        "favorite": { "codepoint": codepoint },
    })))
}

/// DELETE /api/favorites/:codepoint
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Path(codepoint): Path<String>,
) -> ApiResult {
    let user = require_user(&cookies, &state.db).await?;
    let codepoint = parse_codepoint_param(&codepoint).map_err(api_error)?;

    let removed = state.favorites.remove(&user.id, codepoint).await.map_err(api_error)?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}
