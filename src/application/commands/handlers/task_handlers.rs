//! Task Command Handlers

use std::sync::Arc;

use crate::application::commands::{CancelTask, CreateTask};
use crate::application::error::ApplicationError;
use crate::application::ports::{NovelRepositoryPort, QueueError, TaskManagerPort, TaskRepositoryPort};
use crate::domain::novel::Novel;
use crate::domain::task::{ErrorCode, Task};

// ============================================================================
// CreateTask
// ============================================================================

/// CreateTask Handler - 保存小说与任务，并放入工作队列
///
/// 调用方拿到任务 ID 后轮询状态，不等待流程执行
pub struct CreateTaskHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    task_manager: Arc<dyn TaskManagerPort>,
}

impl CreateTaskHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        task_manager: Arc<dyn TaskManagerPort>,
    ) -> Self {
        Self {
            novel_repo,
            task_repo,
            task_manager,
        }
    }

    pub async fn handle(&self, command: CreateTask) -> Result<Task, ApplicationError> {
        // 准入控制：队列已满时直接拒绝，不落库
        if !self.task_manager.has_capacity() {
            return Err(QueueError::Full.into());
        }

        let novel = Novel::new(&command.title, &command.author, command.content)
            .map_err(|e| ApplicationError::validation(e.to_string()))?;
        let mut task = Task::new(&command.user_id, novel.id())
            .map_err(|e| ApplicationError::validation(e.to_string()))?;

        self.novel_repo.save(&novel).await?;
        self.task_repo.save(&task).await?;

        if let Err(e) = self.task_manager.enqueue(task.id()) {
            tracing::warn!(task_id = %task.id(), error = %e, "Task rejected by work queue");
            if task.mark_failed(ErrorCode::QUEUE_REJECTED, e.to_string()).is_ok() {
                self.task_repo.update(&task).await?;
            }
            return Err(e.into());
        }

        tracing::info!(
            task_id = %task.id(),
            novel_id = %novel.id(),
            user_id = %task.user_id(),
            title = %novel.title(),
            word_count = novel.word_count(),
            "Task created"
        );

        Ok(task)
    }
}

// ============================================================================
// CancelTask
// ============================================================================

/// CancelTask Handler - 写入 cancelled 状态并通知执行中的流程
pub struct CancelTaskHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    task_manager: Arc<dyn TaskManagerPort>,
}

impl CancelTaskHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>, task_manager: Arc<dyn TaskManagerPort>) -> Self {
        Self {
            task_repo,
            task_manager,
        }
    }

    pub async fn handle(&self, command: CancelTask) -> Result<Task, ApplicationError> {
        let mut task = self
            .task_repo
            .find_by_id_and_user(command.task_id, &command.user_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", command.task_id))?;

        task.cancel().map_err(|_| {
            ApplicationError::validation(format!(
                "only pending or processing tasks can be cancelled (status: {})",
                task.status().as_str()
            ))
        })?;

        // 与流程的进度写入竞争：已进入终态则拒绝
        if !self.task_repo.update(&task).await? {
            return Err(ApplicationError::validation("task has already finished"));
        }

        let notified = self.task_manager.signal_cancel(task.id());
        tracing::info!(task_id = %task.id(), notified, "Task cancelled");

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TaskManagerPort;
    use crate::domain::task::TaskStatus;
    use crate::infrastructure::memory::InMemoryTaskManager;
    use crate::infrastructure::persistence::sqlite::{test_pool, SqliteTaskRepository};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct Setup {
        repo: Arc<SqliteTaskRepository>,
        manager: Arc<InMemoryTaskManager>,
        _rx: mpsc::Receiver<Uuid>,
    }

    async fn setup() -> Setup {
        let (tx, rx) = mpsc::channel(4);
        Setup {
            repo: Arc::new(SqliteTaskRepository::new(test_pool().await)),
            manager: InMemoryTaskManager::new(tx).arc(),
            _rx: rx,
        }
    }

    async fn stored_task(setup: &Setup, finish: impl FnOnce(&mut Task)) -> Task {
        let mut task = Task::new("user-1", Uuid::new_v4()).unwrap();
        finish(&mut task);
        setup.repo.save(&task).await.unwrap();
        task
    }

    async fn cancel(setup: &Setup, task: &Task) -> Result<Task, ApplicationError> {
        CancelTaskHandler::new(setup.repo.clone(), setup.manager.clone())
            .handle(CancelTask {
                user_id: task.user_id().to_string(),
                task_id: task.id(),
            })
            .await
    }

    #[tokio::test]
    async fn test_cancel_pending_task() {
        let setup = setup().await;
        let task = stored_task(&setup, |_| {}).await;
        let token = setup.manager.register(task.id());

        let cancelled = cancel(&setup, &task).await.unwrap();

        assert_eq!(cancelled.status(), TaskStatus::Cancelled);
        assert!(token.is_cancelled());
        let stored = setup.repo.find_by_id(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_completed_task_is_rejected() {
        let setup = setup().await;
        let task = stored_task(&setup, |t| t.mark_completed().unwrap()).await;

        let result = cancel(&setup, &task).await;

        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        let stored = setup.repo.find_by_id(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_failed_task_is_rejected() {
        let setup = setup().await;
        let task = stored_task(&setup, |t| {
            t.mark_failed(ErrorCode::SCENE_STAGE, "generation failed").unwrap()
        })
        .await;

        let result = cancel(&setup, &task).await;

        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        let stored = setup.repo.find_by_id(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Failed);
        assert_eq!(stored.error_code(), Some(ErrorCode::SCENE_STAGE));
    }

    #[tokio::test]
    async fn test_cancel_of_other_users_task_is_not_found() {
        let setup = setup().await;
        let task = stored_task(&setup, |_| {}).await;

        let result = CancelTaskHandler::new(setup.repo.clone(), setup.manager.clone())
            .handle(CancelTask {
                user_id: "user-2".to_string(),
                task_id: task.id(),
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
    }
}
