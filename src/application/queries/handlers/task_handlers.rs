//! Task Query Handlers

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    CharacterRepositoryPort, MediaRepositoryPort, NovelRepositoryPort, SceneRepositoryPort,
    TaskPage, TaskRepositoryPort,
};
use crate::application::queries::{GetTaskStatus, ListTasks, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::domain::media::MediaStatus;
use crate::domain::task::{Task, TaskStatus};

// ============================================================================
// Response Views
// ============================================================================

/// 角色摘要
#[derive(Debug, Clone)]
pub struct CharacterSummary {
    pub id: Uuid,
    pub name: String,
    pub reference_image_url: Option<String>,
}

/// 场景摘要
#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub id: Uuid,
    pub number: u32,
    pub description: String,
    pub image_url: Option<String>,
}

/// 已完成任务的结果摘要
#[derive(Debug, Clone)]
pub struct TaskResultView {
    pub novel_id: Uuid,
    pub title: String,
    pub character_count: usize,
    pub scene_count: usize,
    pub characters: Vec<CharacterSummary>,
    pub scenes: Vec<SceneSummary>,
}

/// 任务状态（completed 时附带结果）
#[derive(Debug, Clone)]
pub struct TaskStatusView {
    pub task: Task,
    pub result: Option<TaskResultView>,
}

/// 分页信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(u64::from(page_size))
        };
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

/// 任务列表
#[derive(Debug, Clone)]
pub struct TaskListView {
    pub items: Vec<Task>,
    pub pagination: Pagination,
}

// ============================================================================
// GetTaskStatus
// ============================================================================

/// GetTaskStatus Handler
pub struct GetTaskStatusHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    novel_repo: Arc<dyn NovelRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
    scene_repo: Arc<dyn SceneRepositoryPort>,
    media_repo: Arc<dyn MediaRepositoryPort>,
}

impl GetTaskStatusHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        novel_repo: Arc<dyn NovelRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
        scene_repo: Arc<dyn SceneRepositoryPort>,
        media_repo: Arc<dyn MediaRepositoryPort>,
    ) -> Self {
        Self {
            task_repo,
            novel_repo,
            character_repo,
            scene_repo,
            media_repo,
        }
    }

    pub async fn handle(&self, query: GetTaskStatus) -> Result<TaskStatusView, ApplicationError> {
        // 不属于该用户的任务与不存在的任务返回相同的错误
        let task = self
            .task_repo
            .find_by_id_and_user(query.task_id, &query.user_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", query.task_id))?;

        let result = if task.status() == TaskStatus::Completed {
            Some(self.build_result(task.novel_id()).await?)
        } else {
            None
        };

        Ok(TaskStatusView { task, result })
    }

    async fn build_result(&self, novel_id: Uuid) -> Result<TaskResultView, ApplicationError> {
        let novel = self
            .novel_repo
            .find_by_id(novel_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Novel", novel_id))?;

        let characters: Vec<CharacterSummary> = self
            .character_repo
            .find_by_novel(novel_id)
            .await?
            .into_iter()
            .map(|c| CharacterSummary {
                id: c.id(),
                name: c.name().to_string(),
                reference_image_url: c.reference_image_url().map(str::to_string),
            })
            .collect();

        // 每个场景取最近一次完成的图像
        let mut image_urls: HashMap<Uuid, String> = HashMap::new();
        for media in self.media_repo.find_by_novel(novel_id).await? {
            if media.status() != MediaStatus::Completed {
                continue;
            }
            if let (Some(scene_id), Some(url)) = (media.scene_id(), media.url()) {
                image_urls.insert(scene_id, url.to_string());
            }
        }

        let scenes: Vec<SceneSummary> = self
            .scene_repo
            .find_by_novel(novel_id)
            .await?
            .into_iter()
            .map(|s| SceneSummary {
                id: s.id(),
                number: s.number(),
                description: s.description().to_prompt(),
                image_url: image_urls.get(&s.id()).cloned(),
            })
            .collect();

        Ok(TaskResultView {
            novel_id,
            title: novel.title().to_string(),
            character_count: characters.len(),
            scene_count: scenes.len(),
            characters,
            scenes,
        })
    }
}

// ============================================================================
// ListTasks
// ============================================================================

/// ListTasks Handler
pub struct ListTasksHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl ListTasksHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(&self, query: ListTasks) -> Result<TaskListView, ApplicationError> {
        let page = query.page.max(1);
        let page_size = match query.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };

        let (items, total) = self
            .task_repo
            .find_by_user(&TaskPage {
                user_id: query.user_id,
                status: query.status,
                page,
                page_size,
            })
            .await?;

        Ok(TaskListView {
            items,
            pagination: Pagination::new(page, page_size, total),
        })
    }
}
