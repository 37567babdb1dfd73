//! SQLite Novel Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::{db_error, decode_time, decode_uuid, encode_time, DbPool};
use crate::application::ports::{NovelRepositoryPort, RepositoryError};
use crate::domain::novel::{Chapter, Novel, NovelStatus, Title};

/// 单条 INSERT 的最大章节数
const BATCH_SIZE: usize = 500;

/// SQLite Novel Repository
pub struct SqliteNovelRepository {
    pool: DbPool,
}

impl SqliteNovelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct NovelRow {
    id: String,
    title: String,
    author: String,
    content: String,
    status: String,
    word_count: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<NovelRow> for Novel {
    type Error = RepositoryError;

    fn try_from(row: NovelRow) -> Result<Self, Self::Error> {
        Ok(Novel {
            id: decode_uuid(&row.id)?,
            title: Title::new(&row.title)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            author: row.author,
            content: row.content,
            status: NovelStatus::from_str(&row.status).unwrap_or_default(),
            word_count: row.word_count as usize,
            chapters: Vec::new(),
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChapterRow {
    id: String,
    novel_id: String,
    number: i64,
    title: String,
    content: String,
    word_count: i64,
    created_at: String,
}

impl TryFrom<ChapterRow> for Chapter {
    type Error = RepositoryError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        Ok(Chapter {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            number: row.number as u32,
            title: row.title,
            content: row.content,
            word_count: row.word_count as usize,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

#[async_trait]
impl NovelRepositoryPort for SqliteNovelRepository {
    async fn save(&self, novel: &Novel) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO novels (id, title, author, content, status, word_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                content = excluded.content,
                status = excluded.status,
                word_count = excluded.word_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(novel.id().to_string())
        .bind(novel.title().as_str())
        .bind(novel.author())
        .bind(novel.content())
        .bind(novel.status().as_str())
        .bind(novel.word_count() as i64)
        .bind(encode_time(&novel.created_at()))
        .bind(encode_time(&novel.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Novel>, RepositoryError> {
        let row: Option<NovelRow> = sqlx::query_as(
            "SELECT id, title, author, content, status, word_count, created_at, updated_at FROM novels WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Novel::try_from).transpose()
    }

    async fn save_chapters(&self, novel_id: Uuid, chapters: &[Chapter]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM chapters WHERE novel_id = ?")
            .bind(novel_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for chunk in chapters.chunks(BATCH_SIZE) {
            let mut query = String::from(
                "INSERT INTO chapters (id, novel_id, number, title, content, word_count, created_at) VALUES ",
            );
            let placeholders: Vec<&str> = chunk.iter().map(|_| "(?, ?, ?, ?, ?, ?, ?)").collect();
            query.push_str(&placeholders.join(", "));

            let mut sql_query = sqlx::query(&query);
            for chapter in chunk {
                sql_query = sql_query
                    .bind(chapter.id().to_string())
                    .bind(novel_id.to_string())
                    .bind(i64::from(chapter.number()))
                    .bind(chapter.title())
                    .bind(chapter.content())
                    .bind(chapter.word_count() as i64)
                    .bind(encode_time(&chapter.created_at()));
            }

            sql_query.execute(&mut *tx).await.map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn find_chapters(&self, novel_id: Uuid) -> Result<Vec<Chapter>, RepositoryError> {
        let rows: Vec<ChapterRow> = sqlx::query_as(
            "SELECT id, novel_id, number, title, content, word_count, created_at FROM chapters WHERE novel_id = ? ORDER BY number",
        )
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Chapter::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::test_pool;

    fn sample_novel() -> Novel {
        let body = "夜色深沉，城中灯火渐次熄灭，只有远处的钟楼还亮着一盏孤灯。".repeat(3);
        let content = format!("第一章 初遇\n{}\n第二章 别离\n{}", body, body);
        Novel::new("长夜", "佚名", content).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find_novel() {
        let repo = SqliteNovelRepository::new(test_pool().await);
        let mut novel = sample_novel();
        repo.save(&novel).await.unwrap();

        novel.set_status(NovelStatus::Processing);
        repo.save(&novel).await.unwrap();

        let found = repo.find_by_id(novel.id()).await.unwrap().unwrap();
        assert_eq!(found.title().as_str(), "长夜");
        assert_eq!(found.author(), "佚名");
        assert_eq!(found.status(), NovelStatus::Processing);
        assert_eq!(found.word_count(), novel.word_count());
        assert!(found.chapters().is_empty());

        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_chapters_replaces_existing() {
        let repo = SqliteNovelRepository::new(test_pool().await);
        let mut novel = sample_novel();
        repo.save(&novel).await.unwrap();

        let chapters = novel.parse_chapters().unwrap().to_vec();
        assert_eq!(chapters.len(), 2);
        repo.save_chapters(novel.id(), &chapters).await.unwrap();
        repo.save_chapters(novel.id(), &chapters[..1]).await.unwrap();

        let stored = repo.find_chapters(novel.id()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].number(), 1);
        assert_eq!(stored[0].title(), "第一章 初遇");
        assert_eq!(stored[0].content(), chapters[0].content());
    }

    #[tokio::test]
    async fn test_duplicate_chapter_number_is_rejected() {
        let repo = SqliteNovelRepository::new(test_pool().await);
        let novel = sample_novel();
        repo.save(&novel).await.unwrap();

        let first = Chapter::new(novel.id(), 1, "第一章", "甲", 1).unwrap();
        let second = Chapter::new(novel.id(), 1, "第一章", "乙", 1).unwrap();

        let result = repo.save_chapters(novel.id(), &[first, second]).await;
        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
        assert!(repo.find_chapters(novel.id()).await.unwrap().is_empty());
    }
}
