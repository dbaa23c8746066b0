//! Per-user favorite codepoints / 用户收藏

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{ExplorerError, Result};
use crate::utils::MAX_CODEPOINT;

#[derive(Clone)]
pub struct FavoriteStore {
    db: SqlitePool,
}

impl FavoriteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Favorite codepoints of a user, ascending / 收藏列表
    pub async fn list(&self, user_id: &str) -> Result<Vec<u32>> {
        let codepoints: Vec<i64> = sqlx::query_scalar(
            "SELECT codepoint FROM favorites WHERE user_id = ? ORDER BY codepoint",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(codepoints
            .into_iter()
            .filter_map(|cp| u32::try_from(cp).ok())
            .collect())
    }

    /// Add a favorite; adding twice is not an error / 添加收藏
    /// Returns whether a new row was created.
    pub async fn add(&self, user_id: &str, codepoint: u32) -> Result<bool> {
        if codepoint > MAX_CODEPOINT {
            return Err(ExplorerError::InvalidCodepoint(codepoint.to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO favorites (user_id, codepoint, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, codepoint) DO NOTHING",
        )
        .bind(user_id)
        .bind(i64::from(codepoint))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a favorite / 取消收藏
    /// Returns whether a row was deleted.
    pub async fn remove(&self, user_id: &str, codepoint: u32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND codepoint = ?")
            .bind(user_id)
            .bind(i64::from(codepoint))
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
