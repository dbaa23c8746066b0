use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open the SQLite pool with WAL and a busy timeout / 打开数据库连接池
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?;

    // 启用WAL模式，读写互不阻塞
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    // 设置busy_timeout，避免锁超时
    sqlx::query("PRAGMA busy_timeout=5000").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

    tracing::info!("Database connected (WAL mode)");
    Ok(pool)
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            google_id TEXT NOT NULL UNIQUE,
            email TEXT,
            name TEXT,
            last_login TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // OAuth state between /auth/google and the callback / OAuth 登录中间状态
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_states (
            state TEXT PRIMARY KEY,
            return_to TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorites (
            user_id TEXT NOT NULL,
            codepoint INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, codepoint),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per codepoint; every property is its own column / 字符表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            codepoint INTEGER PRIMARY KEY CHECK (codepoint BETWEEN 0 AND 1114111),
            code TEXT NOT NULL,
            name TEXT,
            name_trigram_count INTEGER NOT NULL DEFAULT 0,
            general_category TEXT,
            script TEXT,
            bidi_class TEXT,
            canonical_combining_class INTEGER,
            decomposition TEXT,
            numeric_value TEXT,
            digit_value TEXT,
            decimal_digit_value TEXT,
            uppercase_mapping INTEGER,
            lowercase_mapping INTEGER,
            titlecase_mapping INTEGER,
            bidi_mirrored_glyph INTEGER,
            block TEXT,
            age TEXT,
            alphabetic INTEGER,
            white_space INTEGER,
            dash INTEGER,
            mirrored INTEGER,
            math INTEGER,
            cased INTEGER,
            id_start INTEGER,
            xid_start INTEGER,
            xid_continue INTEGER,
            id_continue INTEGER,
            grapheme_base INTEGER,
            grapheme_link INTEGER,
            grapheme_extend INTEGER,
            case_ignorable INTEGER,
            changes_when_casefolded INTEGER,
            changes_when_casemapped INTEGER,
            changes_when_lowercased INTEGER,
            changes_when_titlecased INTEGER,
            changes_when_uppercased INTEGER,
            default_ignorable_code_point INTEGER,
            lowercase INTEGER,
            uppercase INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS confusables (
            codepoint INTEGER NOT NULL,
            confusable_with INTEGER NOT NULL,
            PRIMARY KEY (codepoint, confusable_with),
            CHECK (codepoint != confusable_with)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Materialized name trigrams for fuzzy search / 名称三元组
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS name_trigrams (
            codepoint INTEGER NOT NULL,
            trigram TEXT NOT NULL,
            PRIMARY KEY (codepoint, trigram)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建索引
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_characters_script ON characters(script)",
        "CREATE INDEX IF NOT EXISTS idx_characters_category ON characters(general_category)",
        "CREATE INDEX IF NOT EXISTS idx_characters_bidi_class ON characters(bidi_class)",
        "CREATE INDEX IF NOT EXISTS idx_characters_age ON characters(age)",
        "CREATE INDEX IF NOT EXISTS idx_characters_block ON characters(block)",
        "CREATE INDEX IF NOT EXISTS idx_characters_name ON characters(name)",
        "CREATE INDEX IF NOT EXISTS idx_confusables_target ON confusables(confusable_with)",
        "CREATE INDEX IF NOT EXISTS idx_name_trigrams_trigram ON name_trigrams(trigram, codepoint)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::memory_pool;
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for table in ["characters", "confusables", "favorites", "name_trigrams", "sessions", "users"] {
            assert!(names.contains(&table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_confusable_self_pair_rejected() {
        let pool = memory_pool().await;
        let result = sqlx::query("INSERT INTO confusables (codepoint, confusable_with) VALUES (65, 65)")
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
