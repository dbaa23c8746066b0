use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_cookies::Cookies;

use unicode_explorer_backend::corpus::PageRequest;
use unicode_explorer_backend::filter::{Dimension, SortDirection, SortKey};
use unicode_explorer_backend::query::{lookup_character, query_characters};
use unicode_explorer_backend::utils::{parse_codepoint_param, parse_page};

use crate::api::{api_error, internal_error, ApiResult};
use crate::auth::current_user;
use crate::state::AppState;

fn dimension_list(state: &AppState, dimension: Dimension) -> Json<Value> {
    Json(json!({ dimension.prefix(): state.catalog.values(dimension) }))
}

/// GET /api/scripts
pub async fn list_scripts(State(state): State<Arc<AppState>>) -> Json<Value> {
    dimension_list(&state, Dimension::Scripts)
}

/// GET /api/categories
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Value> {
    dimension_list(&state, Dimension::Categories)
}

/// GET /api/classes
pub async fn list_classes(State(state): State<Arc<AppState>>) -> Json<Value> {
    dimension_list(&state, Dimension::Classes)
}

/// GET /api/versions
pub async fn list_versions(State(state): State<Arc<AppState>>) -> Json<Value> {
    dimension_list(&state, Dimension::Versions)
}

/// GET /api/decomposition-types - 包含 canonical
pub async fn list_decomposition_types(State(state): State<Arc<AppState>>) -> Json<Value> {
    dimension_list(&state, Dimension::DecompositionTypes)
}

/// Query string of the character list / 字符列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct CharactersQuery {
    pub filters: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

/// GET /api/characters - 按筛选条件分页查询
pub async fn get_characters(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Query(query): Query<CharactersQuery>,
) -> ApiResult {
    let request = PageRequest {
        page: parse_page(query.page.as_deref()),
        sort: SortKey::parse(query.sort.as_deref()),
        direction: SortDirection::parse(query.dir.as_deref()),
    };

    // 登录与否只影响收藏筛选
    let user = current_user(&cookies, &state.db).await.map_err(|e| {
        tracing::error!("Session lookup failed: {}", e);
        internal_error()
    })?;

    let page = query_characters(
        state.corpus.as_ref(),
        &state.catalog,
        query.filters.as_deref().unwrap_or_default(),
        user.as_ref().map(|u| u.id.as_str()),
        request,
    )
    .await
    .map_err(api_error)?;

    Ok(Json(json!({
        "characters": page.characters,
        "totalCount": page.total_count,
    })))
}

/// GET /api/character/:codepoint
pub async fn get_character(
    State(state): State<Arc<AppState>>,
    Path(codepoint): Path<String>,
) -> ApiResult {
    let codepoint = parse_codepoint_param(&codepoint).map_err(api_error)?;
    let record = lookup_character(state.corpus.as_ref(), codepoint)
        .await
        .map_err(api_error)?;
    Ok(Json(json!(record)))
}
