//! Data Transfer Objects

use serde::Serialize;
use uuid::Uuid;

use crate::application::{Pagination, ScenePrompt, TaskListView, TaskResultView, TaskStatusView};
use crate::domain::character::{Appearance, Character, Personality};
use crate::domain::scene::{Description, Dialogue, Scene};
use crate::domain::task::{ProgressDetails, Task};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// Task DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub step: String,
    pub step_index: u32,
    pub percentage: u8,
    pub details: ProgressDetails,
}

/// 失败任务的错误信息
#[derive(Debug, Serialize)]
pub struct TaskErrorResponse {
    pub code: u32,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub novel_id: Uuid,
    pub status: String,
    pub progress: ProgressResponse,
    pub error: Option<TaskErrorResponse>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
    pub failed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        let error = task.error_code().map(|code| TaskErrorResponse {
            code: code.value(),
            message: task.error_message().unwrap_or_default().to_string(),
            retryable: code.is_retryable(),
        });

        Self {
            task_id: task.id(),
            novel_id: task.novel_id(),
            status: task.status().as_str().to_string(),
            progress: ProgressResponse {
                step: task.step().to_string(),
                step_index: task.step_index(),
                percentage: task.percentage(),
                details: task.details(),
            },
            error,
            created_at: task.created_at().to_rfc3339(),
            updated_at: task.updated_at().to_rfc3339(),
            completed_at: task.completed_at().map(|t| t.to_rfc3339()),
            failed_at: task.failed_at().map(|t| t.to_rfc3339()),
            cancelled_at: task.cancelled_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CharacterSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub reference_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SceneSummaryResponse {
    pub id: Uuid,
    pub number: u32,
    pub description: String,
    pub image_url: Option<String>,
}

/// 已完成任务的结果摘要
#[derive(Debug, Serialize)]
pub struct TaskResultResponse {
    pub novel_id: Uuid,
    pub title: String,
    pub character_count: usize,
    pub scene_count: usize,
    pub characters: Vec<CharacterSummaryResponse>,
    pub scenes: Vec<SceneSummaryResponse>,
}

impl From<TaskResultView> for TaskResultResponse {
    fn from(view: TaskResultView) -> Self {
        Self {
            novel_id: view.novel_id,
            title: view.title,
            character_count: view.character_count,
            scene_count: view.scene_count,
            characters: view
                .characters
                .into_iter()
                .map(|c| CharacterSummaryResponse {
                    id: c.id,
                    name: c.name,
                    reference_image_url: c.reference_image_url,
                })
                .collect(),
            scenes: view
                .scenes
                .into_iter()
                .map(|s| SceneSummaryResponse {
                    id: s.id,
                    number: s.number,
                    description: s.description,
                    image_url: s.image_url,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    #[serde(flatten)]
    pub task: TaskResponse,
    pub result: Option<TaskResultResponse>,
}

impl From<TaskStatusView> for TaskStatusResponse {
    fn from(view: TaskStatusView) -> Self {
        Self {
            task: TaskResponse::from(&view.task),
            result: view.result.map(TaskResultResponse::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<Pagination> for PaginationResponse {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            page_size: p.page_size,
            total: p.total,
            total_pages: p.total_pages,
            has_next: p.has_next,
            has_prev: p.has_prev,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub items: Vec<TaskResponse>,
    pub pagination: PaginationResponse,
}

impl From<TaskListView> for TaskListResponse {
    fn from(view: TaskListView) -> Self {
        Self {
            items: view.items.iter().map(TaskResponse::from).collect(),
            pagination: view.pagination.into(),
        }
    }
}

// ============================================================================
// Character DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CharacterResponse {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub name: String,
    pub role: String,
    pub description: String,
    pub appearance: Appearance,
    pub personality: Personality,
    pub reference_image_url: Option<String>,
    pub created_at: String,
}

impl From<&Character> for CharacterResponse {
    fn from(c: &Character) -> Self {
        Self {
            id: c.id(),
            novel_id: c.novel_id(),
            name: c.name().to_string(),
            role: c.role().as_str().to_string(),
            description: c.description().to_string(),
            appearance: c.appearance().clone(),
            personality: c.personality().clone(),
            reference_image_url: c.reference_image_url().map(str::to_string),
            created_at: c.created_at().to_rfc3339(),
        }
    }
}

// ============================================================================
// Scene DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SceneResponse {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub novel_id: Uuid,
    pub number: u32,
    pub status: String,
    pub location: Option<String>,
    pub time_of_day: Option<String>,
    pub description: Description,
    pub dialogues: Vec<Dialogue>,
    pub character_ids: Vec<Uuid>,
    pub image_prompt: Option<String>,
    pub video_prompt: Option<String>,
}

impl From<&Scene> for SceneResponse {
    fn from(s: &Scene) -> Self {
        Self {
            id: s.id(),
            chapter_id: s.chapter_id(),
            novel_id: s.novel_id(),
            number: s.number(),
            status: s.status().as_str().to_string(),
            location: s.location().map(str::to_string),
            time_of_day: s.time_of_day().map(str::to_string),
            description: s.description().clone(),
            dialogues: s.dialogues().to_vec(),
            character_ids: s.character_ids().to_vec(),
            image_prompt: s.image_prompt().map(str::to_string),
            video_prompt: s.video_prompt().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScenePromptResponse {
    pub scene_id: Uuid,
    pub image_prompt: String,
    pub video_prompt: Option<String>,
}

impl From<ScenePrompt> for ScenePromptResponse {
    fn from(p: ScenePrompt) -> Self {
        Self {
            scene_id: p.scene_id,
            image_prompt: p.image_prompt,
            video_prompt: p.video_prompt,
        }
    }
}
