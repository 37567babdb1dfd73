//! SQLite Task Repository
//!
//! `update` 只在已存储的状态不是终态时写入，取消与流程进度写入之间不会互相覆盖。

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    db_error, decode_json, decode_optional_time, decode_time, decode_uuid, encode_json,
    encode_time, DbPool,
};
use crate::application::ports::{RepositoryError, TaskPage, TaskRepositoryPort};
use crate::domain::task::{ErrorCode, Task, TaskStatus};

const SELECT_COLUMNS: &str = "SELECT id, user_id, novel_id, status, step, step_index, percentage, details, error_code, error_message, created_at, updated_at, completed_at, failed_at, cancelled_at FROM tasks";

/// SQLite Task Repository
pub struct SqliteTaskRepository {
    pool: DbPool,
}

impl SqliteTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    user_id: String,
    novel_id: String,
    status: String,
    step: String,
    step_index: i64,
    percentage: i64,
    details: String,
    error_code: Option<i64>,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
    failed_at: Option<String>,
    cancelled_at: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::from_str(&row.status).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown task status: {}", row.status))
        })?;

        Ok(Task {
            id: decode_uuid(&row.id)?,
            user_id: row.user_id,
            novel_id: decode_uuid(&row.novel_id)?,
            status,
            step: row.step,
            step_index: row.step_index as u32,
            percentage: row.percentage.clamp(0, 100) as u8,
            details: decode_json(&row.details)?,
            error_code: row.error_code.map(|c| ErrorCode(c as u32)),
            error_message: row.error_message,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
            completed_at: decode_optional_time(row.completed_at)?,
            failed_at: decode_optional_time(row.failed_at)?,
            cancelled_at: decode_optional_time(row.cancelled_at)?,
        })
    }
}

fn encode_optional_time(t: Option<chrono::DateTime<chrono::Utc>>) -> Option<String> {
    t.map(|t| encode_time(&t))
}

#[async_trait]
impl TaskRepositoryPort for SqliteTaskRepository {
    async fn save(&self, task: &Task) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, novel_id, status, step, step_index, percentage, details, error_code, error_message, created_at, updated_at, completed_at, failed_at, cancelled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                step = excluded.step,
                step_index = excluded.step_index,
                percentage = excluded.percentage,
                details = excluded.details,
                error_code = excluded.error_code,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at,
                completed_at = excluded.completed_at,
                failed_at = excluded.failed_at,
                cancelled_at = excluded.cancelled_at
            "#,
        )
        .bind(task.id().to_string())
        .bind(task.user_id())
        .bind(task.novel_id().to_string())
        .bind(task.status().as_str())
        .bind(task.step())
        .bind(i64::from(task.step_index()))
        .bind(i64::from(task.percentage()))
        .bind(encode_json(&task.details())?)
        .bind(task.error_code().map(|c| i64::from(c.value())))
        .bind(task.error_message())
        .bind(encode_time(&task.created_at()))
        .bind(encode_time(&task.updated_at()))
        .bind(encode_optional_time(task.completed_at()))
        .bind(encode_optional_time(task.failed_at()))
        .bind(encode_optional_time(task.cancelled_at()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                status = ?,
                step = ?,
                step_index = ?,
                percentage = ?,
                details = ?,
                error_code = ?,
                error_message = ?,
                updated_at = ?,
                completed_at = ?,
                failed_at = ?,
                cancelled_at = ?
            WHERE id = ? AND status NOT IN ('completed', 'failed', 'cancelled')
            "#,
        )
        .bind(task.status().as_str())
        .bind(task.step())
        .bind(i64::from(task.step_index()))
        .bind(i64::from(task.percentage()))
        .bind(encode_json(&task.details())?)
        .bind(task.error_code().map(|c| i64::from(c.value())))
        .bind(task.error_message())
        .bind(encode_time(&task.updated_at()))
        .bind(encode_optional_time(task.completed_at()))
        .bind(encode_optional_time(task.failed_at()))
        .bind(encode_optional_time(task.cancelled_at()))
        .bind(task.id().to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Task::try_from).transpose()
    }

    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Task>, RepositoryError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("{} WHERE id = ? AND user_id = ?", SELECT_COLUMNS))
                .bind(id.to_string())
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(Task::try_from).transpose()
    }

    async fn find_by_user(&self, page: &TaskPage) -> Result<(Vec<Task>, u64), RepositoryError> {
        let status = page.status.map(|s| s.as_str());

        // status 为 NULL 时不过滤
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE user_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(&page.user_id)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = ? AND (? IS NULL OR status = ?) ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS
        ))
        .bind(&page.user_id)
        .bind(status)
        .bind(status)
        .bind(i64::from(page.page_size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((tasks, total.max(0) as u64))
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "{} WHERE status = ? ORDER BY created_at, rowid",
            SELECT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Task::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{ProgressDetails, WorkflowStep};
    use crate::infrastructure::persistence::sqlite::test_pool;

    fn task(user: &str) -> Task {
        Task::new(user, Uuid::new_v4()).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = SqliteTaskRepository::new(test_pool().await);
        let mut t = task("u1");
        repo.save(&t).await.unwrap();

        let details = ProgressDetails {
            characters_extracted: 3,
            ..Default::default()
        };
        t.update_progress(WorkflowStep::Extract, 15, details).unwrap();
        assert!(repo.update(&t).await.unwrap());

        let found = repo.find_by_id(t.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), TaskStatus::Processing);
        assert_eq!(found.step(), "提取角色");
        assert_eq!(found.step_index(), 2);
        assert_eq!(found.percentage(), 15);
        assert_eq!(found.details().characters_extracted, 3);

        assert!(repo.find_by_id_and_user(t.id(), "u1").await.unwrap().is_some());
        assert!(repo.find_by_id_and_user(t.id(), "u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_refuses_to_overwrite_terminal_state() {
        let repo = SqliteTaskRepository::new(test_pool().await);
        let t = task("u1");
        repo.save(&t).await.unwrap();

        // 另一路径先取消
        let mut cancelled = t.clone();
        cancelled.cancel().unwrap();
        assert!(repo.update(&cancelled).await.unwrap());

        // 流程持有的旧副本继续写进度
        let mut stale = t.clone();
        stale
            .update_progress(WorkflowStep::Segment, 5, ProgressDetails::default())
            .unwrap();
        assert!(!repo.update(&stale).await.unwrap());

        let stored = repo.find_by_id(t.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Cancelled);
        assert!(stored.cancelled_at().is_some());
    }

    #[tokio::test]
    async fn test_failed_task_keeps_error_code() {
        let repo = SqliteTaskRepository::new(test_pool().await);
        let mut t = task("u1");
        repo.save(&t).await.unwrap();

        t.mark_failed(ErrorCode::SCENE_STAGE, "upstream error").unwrap();
        assert!(repo.update(&t).await.unwrap());

        let stored = repo.find_by_id(t.id()).await.unwrap().unwrap();
        assert_eq!(stored.error_code(), Some(ErrorCode::SCENE_STAGE));
        assert_eq!(stored.error_message(), Some("upstream error"));
        assert!(stored.is_retryable());
    }

    #[tokio::test]
    async fn test_find_by_user_paginates_newest_first() {
        let repo = SqliteTaskRepository::new(test_pool().await);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let t = task("alice");
            ids.push(t.id());
            repo.save(&t).await.unwrap();
        }
        repo.save(&task("bob")).await.unwrap();

        let mut done = repo.find_by_id(ids[0]).await.unwrap().unwrap();
        done.mark_completed().unwrap();
        repo.update(&done).await.unwrap();

        let page = TaskPage {
            user_id: "alice".to_string(),
            status: None,
            page: 1,
            page_size: 2,
        };
        let (items, total) = repo.find_by_user(&page).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id(), ids[4]);

        let page = TaskPage { page: 3, ..page };
        let (items, _) = repo.find_by_user(&page).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id(), ids[0]);

        let filtered = TaskPage {
            user_id: "alice".to_string(),
            status: Some(TaskStatus::Completed),
            page: 1,
            page_size: 10,
        };
        let (items, total) = repo.find_by_user(&filtered).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id(), ids[0]);
    }

    #[tokio::test]
    async fn test_find_by_status() {
        let repo = SqliteTaskRepository::new(test_pool().await);
        let pending = task("u1");
        let mut running = task("u1");
        repo.save(&pending).await.unwrap();
        repo.save(&running).await.unwrap();
        running
            .update_progress(WorkflowStep::Segment, 5, ProgressDetails::default())
            .unwrap();
        repo.update(&running).await.unwrap();

        let found = repo.find_by_status(TaskStatus::Processing).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), running.id());
        assert_eq!(repo.find_by_status(TaskStatus::Pending).await.unwrap().len(), 1);
    }
}
