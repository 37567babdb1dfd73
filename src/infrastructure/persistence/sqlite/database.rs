//! SQLite Database - 数据库连接和迁移

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use uuid::Uuid;

use crate::application::ports::RepositoryError;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库连接串
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/manvel.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            max_connections: 5,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    // WAL 模式，允许并发读写
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await?;

    // 遇到锁时等待而不是立即失败
    sqlx::query("PRAGMA busy_timeout=5000")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(&pool)
        .await?;

    tracing::info!(
        url = %config.database_url,
        max_connections = config.max_connections,
        "SQLite pool created"
    );

    Ok(pool)
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS novels (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'uploaded',
            word_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapters (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            number INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            word_count INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE,
            UNIQUE (novel_id, number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            appearance TEXT NOT NULL,
            personality TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            reference_image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scenes (
            id TEXT PRIMARY KEY,
            chapter_id TEXT NOT NULL,
            novel_id TEXT NOT NULL,
            number INTEGER NOT NULL,
            location TEXT,
            time_of_day TEXT,
            description TEXT NOT NULL,
            dialogues TEXT NOT NULL,
            character_ids TEXT NOT NULL,
            image_prompt TEXT,
            video_prompt TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media (
            id TEXT PRIMARY KEY,
            scene_id TEXT,
            novel_id TEXT,
            media_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            url TEXT,
            metadata TEXT NOT NULL,
            generation_id TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            novel_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            step TEXT NOT NULL,
            step_index INTEGER NOT NULL DEFAULT 0,
            percentage INTEGER NOT NULL DEFAULT 0,
            details TEXT NOT NULL,
            error_code INTEGER,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT,
            failed_at TEXT,
            cancelled_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 索引
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_chapters_novel_id ON chapters(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_characters_novel_id ON characters(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_scenes_chapter_id ON scenes(chapter_id)",
        "CREATE INDEX IF NOT EXISTS idx_scenes_novel_id ON scenes(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_media_scene_id ON media(scene_id)",
        "CREATE INDEX IF NOT EXISTS idx_media_novel_id ON media(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_tasks_user_created ON tasks(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

// ============================================================================
// 行映射辅助
// ============================================================================

pub(crate) fn db_error(e: sqlx::Error) -> RepositoryError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => RepositoryError::Duplicate(db.message().to_string()),
        _ => RepositoryError::DatabaseError(e.to_string()),
    }
}

/// 固定精度，保证字符串排序与时间顺序一致
pub(crate) fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn decode_optional_time(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    s.as_deref().map(decode_time).transpose()
}

pub(crate) fn decode_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// 落库一部两章的小说及其章节，供依赖外键的仓储测试使用
#[cfg(test)]
pub(crate) async fn seed_novel(pool: &DbPool) -> crate::domain::novel::Novel {
    use super::SqliteNovelRepository;
    use crate::application::ports::NovelRepositoryPort;

    let body = "山间小路上雾气未散，远处传来几声鸟鸣，一切都还很安静。".repeat(2);
    let content = format!("第一章 上山\n{body}\n第二章 下山\n{body}");
    let mut novel = crate::domain::novel::Novel::new("山行", "佚名", content).unwrap();
    novel.parse_chapters().unwrap();

    let repo = SqliteNovelRepository::new(pool.clone());
    repo.save(&novel).await.unwrap();
    repo.save_chapters(novel.id(), novel.chapters()).await.unwrap();
    novel
}
