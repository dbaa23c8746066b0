//! Google sign-in (OAuth2 authorization code flow) / Google 登录
//!
//! `/auth/google` stores a one-shot state row and redirects to Google;
//! the callback consumes it, exchanges the code, upserts the user and
//! opens a cookie session.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_cookies::Cookies;

use unicode_explorer_backend::config::{get_config, AppConfig};

use crate::api::{internal_error, ApiResult};
use crate::auth::{current_user, end_session, start_session};
use crate::state::AppState;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// How long a login attempt may take / 登录状态有效期
const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// OAuth 回调参数
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Google OAuth token 响应
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Google userinfo 响应
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Only same-site relative paths are accepted as return targets / 仅允许站内路径
fn sanitize_return_to(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn client_url(config: &AppConfig, path: &str) -> String {
    format!("{}{}", config.auth.client_base_url.trim_end_matches('/'), path)
}

/// GET /auth/google?returnTo= - 跳转到 Google 授权页
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> Result<Redirect, (StatusCode, Json<Value>)> {
    let config = get_config().read().clone();
    if !config.auth_enabled() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Google sign-in is not configured"})),
        ));
    }

    let oauth_state = uuid::Uuid::new_v4().to_string();
    let return_to = sanitize_return_to(params.return_to.as_deref());
    let expires_at = (Utc::now() + Duration::minutes(STATE_TTL_MINUTES))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    // 顺便清理过期的登录状态
    if let Err(e) = purge_expired_states(&state.db).await {
        tracing::warn!("Failed to purge expired oauth states: {}", e);
    }

    sqlx::query("INSERT INTO oauth_states (state, return_to, expires_at) VALUES (?, ?, ?)")
        .bind(&oauth_state)
        .bind(&return_to)
        .bind(&expires_at)
        .execute(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store oauth state: {}", e);
            internal_error()
        })?;

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&config.auth.client_id),
        urlencoding::encode(&config.get_oauth_callback_url()),
        urlencoding::encode("openid email profile"),
        urlencoding::encode(&oauth_state),
    );
    Ok(Redirect::to(&url))
}

/// Drop login attempts that ran out of time / 清理过期登录状态
async fn purge_expired_states(db: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= datetime('now')")
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Take the state row once; expired or unknown states yield `None` / 消费登录状态
async fn consume_state(db: &SqlitePool, oauth_state: &str) -> Result<Option<String>, sqlx::Error> {
    // single statement, so a state cannot be redeemed twice
    sqlx::query_scalar(
        "DELETE FROM oauth_states WHERE state = ? AND expires_at > datetime('now') RETURNING return_to",
    )
    .bind(oauth_state)
    .fetch_optional(db)
    .await
}

/// 用授权码换取 access_token 并获取用户信息
async fn fetch_google_user(
    client: &reqwest::Client,
    config: &AppConfig,
    code: &str,
) -> Result<GoogleUserInfo, String> {
    let redirect_uri = config.get_oauth_callback_url();
    let params = [
        ("code", code),
        ("client_id", config.auth.client_id.as_str()),
        ("client_secret", config.auth.client_secret.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let token: GoogleTokenResponse = client
        .post(GOOGLE_TOKEN_URL)
        .form(&params)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?
        .json()
        .await
        .map_err(|e| format!("Invalid response: {}", e))?;

    if let Some(error) = token.error {
        return Err(token.error_description.unwrap_or(error));
    }
    let access_token = token.access_token.ok_or("No access token in response")?;

    client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?
        .error_for_status()
        .map_err(|e| format!("Userinfo rejected: {}", e))?
        .json::<GoogleUserInfo>()
        .await
        .map_err(|e| format!("Invalid response: {}", e))
}

/// Insert or refresh the user row, returning its id / 创建或更新用户
async fn upsert_user(db: &SqlitePool, info: &GoogleUserInfo) -> Result<String, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO users (id, google_id, email, name, last_login, created_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT (google_id) DO UPDATE SET
               email = excluded.email,
               name = excluded.name,
               last_login = excluded.last_login"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&info.sub)
    .bind(&info.email)
    .bind(&info.name)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    sqlx::query_scalar("SELECT id FROM users WHERE google_id = ?")
        .bind(&info.sub)
        .fetch_one(db)
        .await
}

async fn complete_login(
    state: &AppState,
    cookies: &Cookies,
    config: &AppConfig,
    params: OAuthCallbackParams,
) -> Result<String, String> {
    if let Some(error) = params.error {
        return Err(format!("Provider returned error: {}", error));
    }
    let code = params.code.ok_or("Missing authorization code")?;
    let oauth_state = params.state.ok_or("Missing state")?;

    let return_to = consume_state(&state.db, &oauth_state)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("Unknown or expired state")?;

    let info = fetch_google_user(&state.http, config, &code).await?;
    let user_id = upsert_user(&state.db, &info).await.map_err(|e| e.to_string())?;
    start_session(&state.db, cookies, &user_id, config.auth.session_days)
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!("User {} signed in", user_id);
    Ok(return_to)
}

/// GET /auth/google/callback - 成功回到 returnTo，失败回到登录页
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Query(params): Query<OAuthCallbackParams>,
) -> Redirect {
    let config = get_config().read().clone();
    match complete_login(&state, &cookies, &config, params).await {
        Ok(return_to) => Redirect::to(&client_url(&config, &return_to)),
        Err(e) => {
            tracing::warn!("Google sign-in failed: {}", e);
            Redirect::to(&client_url(&config, "/login"))
        }
    }
}

/// GET /auth/me
pub async fn me(State(state): State<Arc<AppState>>, cookies: Cookies) -> ApiResult {
    let user = current_user(&cookies, &state.db).await.map_err(|e| {
        tracing::error!("Session lookup failed: {}", e);
        internal_error()
    })?;

    match user {
        Some(user) => Ok(Json(json!(user))),
        None => Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "Not authenticated"})))),
    }
}

/// POST /auth/logout
pub async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> ApiResult {
    end_session(&state.db, &cookies).await.map_err(|e| {
        tracing::error!("Failed to end session: {}", e);
        internal_error()
    })?;
    Ok(Json(json!({"message": "Logged out successfully"})))
}
