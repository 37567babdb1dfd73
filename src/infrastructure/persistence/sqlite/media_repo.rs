//! SQLite Media Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    db_error, decode_json, decode_optional_time, decode_time, decode_uuid, encode_json,
    encode_time, DbPool,
};
use crate::application::ports::{MediaRepositoryPort, RepositoryError};
use crate::domain::media::{Media, MediaStatus, MediaType};

const SELECT_COLUMNS: &str = "SELECT id, scene_id, novel_id, media_type, status, url, metadata, generation_id, error_message, created_at, updated_at, completed_at FROM media";

/// SQLite Media Repository
pub struct SqliteMediaRepository {
    pool: DbPool,
}

impl SqliteMediaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, id: Uuid) -> Result<Vec<Media>, RepositoryError> {
        let rows: Vec<MediaRow> = sqlx::query_as(&format!(
            "{} WHERE {} = ? ORDER BY created_at, rowid",
            SELECT_COLUMNS, clause
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Media::try_from).collect()
    }
}

#[derive(FromRow)]
struct MediaRow {
    id: String,
    scene_id: Option<String>,
    novel_id: Option<String>,
    media_type: String,
    status: String,
    url: Option<String>,
    metadata: String,
    generation_id: Option<String>,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<MediaRow> for Media {
    type Error = RepositoryError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        let media_type = MediaType::from_str(&row.media_type).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown media type: {}", row.media_type))
        })?;
        let status = MediaStatus::from_str(&row.status).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown media status: {}", row.status))
        })?;

        Ok(Media {
            id: decode_uuid(&row.id)?,
            scene_id: row.scene_id.as_deref().map(decode_uuid).transpose()?,
            novel_id: row.novel_id.as_deref().map(decode_uuid).transpose()?,
            media_type,
            status,
            url: row.url,
            metadata: decode_json(&row.metadata)?,
            generation_id: row.generation_id,
            error_message: row.error_message,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
            completed_at: decode_optional_time(row.completed_at)?,
        })
    }
}

#[async_trait]
impl MediaRepositoryPort for SqliteMediaRepository {
    async fn save(&self, media: &Media) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO media (id, scene_id, novel_id, media_type, status, url, metadata, generation_id, error_message, created_at, updated_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                url = excluded.url,
                metadata = excluded.metadata,
                generation_id = excluded.generation_id,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(media.id().to_string())
        .bind(media.scene_id().map(|id| id.to_string()))
        .bind(media.novel_id().map(|id| id.to_string()))
        .bind(media.media_type().as_str())
        .bind(media.status().as_str())
        .bind(media.url())
        .bind(encode_json(media.metadata())?)
        .bind(media.generation_id())
        .bind(media.error_message())
        .bind(encode_time(&media.created_at()))
        .bind(encode_time(&media.updated_at()))
        .bind(media.completed_at().map(|t| encode_time(&t)))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Media>, RepositoryError> {
        let row: Option<MediaRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Media::try_from).transpose()
    }

    async fn find_by_scene(&self, scene_id: Uuid) -> Result<Vec<Media>, RepositoryError> {
        self.fetch_where("scene_id", scene_id).await
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Media>, RepositoryError> {
        self.fetch_where("novel_id", novel_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::MediaMetadata;
    use crate::infrastructure::persistence::sqlite::test_pool;

    #[tokio::test]
    async fn test_media_lifecycle_persisted() {
        let repo = SqliteMediaRepository::new(test_pool().await);
        let (scene_id, novel_id) = (Uuid::new_v4(), Uuid::new_v4());

        let mut media = Media::scene_image(scene_id, novel_id);
        repo.save(&media).await.unwrap();
        media.mark_generating().unwrap();
        media
            .mark_completed(
                "https://img.example/1.png",
                MediaMetadata::image(1024, 768, "png"),
                Some("gen-1".to_string()),
            )
            .unwrap();
        repo.save(&media).await.unwrap();

        let found = repo.find_by_id(media.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), MediaStatus::Completed);
        assert_eq!(found.url(), Some("https://img.example/1.png"));
        assert_eq!(found.metadata().resolution, "1024x768");
        assert_eq!(found.generation_id(), Some("gen-1"));
        assert!(found.completed_at().is_some());

        assert_eq!(repo.find_by_scene(scene_id).await.unwrap().len(), 1);
        assert_eq!(repo.find_by_novel(novel_id).await.unwrap().len(), 1);
        assert!(repo.find_by_scene(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_media_keeps_error() {
        let repo = SqliteMediaRepository::new(test_pool().await);
        let mut media = Media::new(None, Some(Uuid::new_v4()), MediaType::Video).unwrap();
        media.mark_failed("upstream timeout").unwrap();
        repo.save(&media).await.unwrap();

        let found = repo.find_by_id(media.id()).await.unwrap().unwrap();
        assert_eq!(found.media_type(), MediaType::Video);
        assert_eq!(found.status(), MediaStatus::Failed);
        assert_eq!(found.error_message(), Some("upstream timeout"));
        assert!(found.scene_id().is_none());
    }
}
