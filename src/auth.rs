use axum::{http::StatusCode, Json};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_cookies::{Cookie, Cookies};

use unicode_explorer_backend::models::User;

use crate::api::internal_error;

/// Session cookie name / 会话Cookie名
pub const SESSION_COOKIE_NAME: &str = "unicode_session";

/// SQLite `datetime('now')` compatible timestamp format
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

// Session 结构
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Create a new session value (not yet persisted) / 生成会话
pub fn create_session(user_id: &str, days: i64) -> Session {
    Session {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        expires_at: Utc::now() + Duration::days(days.max(1)),
    }
}

/// Persist a session and set its cookie / 保存会话并写入Cookie
pub async fn start_session(
    db: &SqlitePool,
    cookies: &Cookies,
    user_id: &str,
    days: i64,
) -> Result<Session, sqlx::Error> {
    let session = create_session(user_id, days);

    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.expires_at.format(SQLITE_DATETIME).to_string())
        .bind(Utc::now().format(SQLITE_DATETIME).to_string())
        .execute(db)
        .await?;

    let mut cookie = Cookie::new(SESSION_COOKIE_NAME, session.id.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_max_age(tower_cookies::cookie::time::Duration::days(days.max(1)));
    cookies.add(cookie);

    Ok(session)
}

/// Drop the current session, if any, and clear the cookie / 退出登录
pub async fn end_session(db: &SqlitePool, cookies: &Cookies) -> Result<(), sqlx::Error> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE_NAME) {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(cookie.value())
            .execute(db)
            .await?;
    }

    // 必须设置相同的 path 才能正确删除 cookie
    let mut removal_cookie = Cookie::new(SESSION_COOKIE_NAME, "");
    removal_cookie.set_path("/");
    cookies.remove(removal_cookie);
    Ok(())
}

/// User behind the session cookie; `None` when absent or expired / 获取当前用户
pub async fn current_user(cookies: &Cookies, db: &SqlitePool) -> Result<Option<User>, sqlx::Error> {
    let Some(session_cookie) = cookies.get(SESSION_COOKIE_NAME) else {
        return Ok(None);
    };

    sqlx::query_as::<_, User>(
        r#"SELECT u.* FROM users u
           INNER JOIN sessions s ON u.id = s.user_id
           WHERE s.id = ? AND s.expires_at > datetime('now')"#,
    )
    .bind(session_cookie.value())
    .fetch_optional(db)
    .await
}

/// Like `current_user`, but 401 when nobody is logged in / 需要登录
pub async fn require_user(cookies: &Cookies, db: &SqlitePool) -> Result<User, (StatusCode, Json<Value>)> {
    current_user(cookies, db)
        .await
        .map_err(|e| {
            tracing::error!("Session lookup failed: {}", e);
            internal_error()
        })?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(json!({"error": "Authentication required"}))))
}
