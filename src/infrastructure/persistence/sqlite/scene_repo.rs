//! SQLite Scene Repository

use async_trait::async_trait;
use sqlx::{FromRow, Sqlite, Transaction};
use uuid::Uuid;

use super::{db_error, decode_json, decode_time, decode_uuid, encode_json, encode_time, DbPool};
use crate::application::ports::{RepositoryError, SceneRepositoryPort};
use crate::domain::scene::{Scene, SceneStatus};

const SELECT_COLUMNS: &str = "SELECT id, chapter_id, novel_id, number, location, time_of_day, description, dialogues, character_ids, image_prompt, video_prompt, status, created_at, updated_at FROM scenes";

const UPSERT: &str = r#"
    INSERT INTO scenes (id, chapter_id, novel_id, number, location, time_of_day, description, dialogues, character_ids, image_prompt, video_prompt, status, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        number = excluded.number,
        location = excluded.location,
        time_of_day = excluded.time_of_day,
        description = excluded.description,
        dialogues = excluded.dialogues,
        character_ids = excluded.character_ids,
        image_prompt = excluded.image_prompt,
        video_prompt = excluded.video_prompt,
        status = excluded.status,
        updated_at = excluded.updated_at
"#;

/// SQLite Scene Repository
///
/// 描述、对白和角色列表以 JSON 文本存储
pub struct SqliteSceneRepository {
    pool: DbPool,
}

impl SqliteSceneRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn upsert(tx: &mut Transaction<'_, Sqlite>, scene: &Scene) -> Result<(), RepositoryError> {
        sqlx::query(UPSERT)
            .bind(scene.id().to_string())
            .bind(scene.chapter_id().to_string())
            .bind(scene.novel_id().to_string())
            .bind(i64::from(scene.number()))
            .bind(scene.location())
            .bind(scene.time_of_day())
            .bind(encode_json(scene.description())?)
            .bind(encode_json(&scene.dialogues())?)
            .bind(encode_json(&scene.character_ids())?)
            .bind(scene.image_prompt())
            .bind(scene.video_prompt())
            .bind(scene.status().as_str())
            .bind(encode_time(&scene.created_at()))
            .bind(encode_time(&scene.updated_at()))
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}

#[derive(FromRow)]
struct SceneRow {
    id: String,
    chapter_id: String,
    novel_id: String,
    number: i64,
    location: Option<String>,
    time_of_day: Option<String>,
    description: String,
    dialogues: String,
    character_ids: String,
    image_prompt: Option<String>,
    video_prompt: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SceneRow> for Scene {
    type Error = RepositoryError;

    fn try_from(row: SceneRow) -> Result<Self, Self::Error> {
        let status = SceneStatus::from_str(&row.status).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown scene status: {}", row.status))
        })?;

        Ok(Scene {
            id: decode_uuid(&row.id)?,
            chapter_id: decode_uuid(&row.chapter_id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            number: row.number as u32,
            location: row.location,
            time_of_day: row.time_of_day,
            description: decode_json(&row.description)?,
            dialogues: decode_json(&row.dialogues)?,
            character_ids: decode_json(&row.character_ids)?,
            image_prompt: row.image_prompt,
            video_prompt: row.video_prompt,
            status,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl SceneRepositoryPort for SqliteSceneRepository {
    async fn save(&self, scene: &Scene) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        Self::upsert(&mut tx, scene).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn save_batch(&self, scenes: &[Scene]) -> Result<(), RepositoryError> {
        if scenes.is_empty() {
            return Ok(());
        }

        // 任一失败时事务随 tx 析构回滚
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for scene in scenes {
            Self::upsert(&mut tx, scene).await?;
        }
        tx.commit().await.map_err(db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Scene>, RepositoryError> {
        let row: Option<SceneRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Scene::try_from).transpose()
    }

    async fn find_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<Scene>, RepositoryError> {
        let rows: Vec<SceneRow> = sqlx::query_as(&format!(
            "{} WHERE chapter_id = ? ORDER BY number",
            SELECT_COLUMNS
        ))
        .bind(chapter_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Scene::try_from).collect()
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Scene>, RepositoryError> {
        // 章节序号来自 chapters 表；章节行缺失时退回按创建时间
        let rows: Vec<SceneRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.chapter_id, s.novel_id, s.number, s.location, s.time_of_day, s.description,
                   s.dialogues, s.character_ids, s.image_prompt, s.video_prompt, s.status, s.created_at, s.updated_at
            FROM scenes s
            LEFT JOIN chapters c ON c.id = s.chapter_id
            WHERE s.novel_id = ?
            ORDER BY c.number, s.created_at, s.number
            "#,
        )
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Scene::try_from).collect()
    }
}
