//! Task HTTP Handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{CancelTask, CreateTask, GetTaskStatus, ListTasks};
use crate::domain::task::TaskStatus;
use crate::infrastructure::http::dto::{ApiResponse, TaskListResponse, TaskResponse, TaskStatusResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::extract::UserId;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskIdRequest {
    pub task_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub status: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// 创建生成任务，立即返回 pending 状态的任务
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<ApiResponse<TaskResponse>>, ApiError> {
    let task = state
        .create_task_handler
        .handle(CreateTask {
            user_id,
            title: req.title,
            author: req.author,
            content: req.content,
        })
        .await?;

    Ok(Json(ApiResponse::success(TaskResponse::from(&task))))
}

/// 查询任务状态；完成的任务附带结果摘要
pub async fn get_task_status(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<TaskStatusResponse>>, ApiError> {
    let view = state
        .get_task_status_handler
        .handle(GetTaskStatus {
            user_id,
            task_id: req.task_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(req): Json<ListTasksRequest>,
) -> Result<Json<ApiResponse<TaskListResponse>>, ApiError> {
    let status = match req.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(
            TaskStatus::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown task status: {}", s)))?,
        ),
        None => None,
    };

    let view = state
        .list_tasks_handler
        .handle(ListTasks {
            user_id,
            page: req.page,
            page_size: req.page_size,
            status,
        })
        .await?;

    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<TaskResponse>>, ApiError> {
    let task = state
        .cancel_task_handler
        .handle(CancelTask {
            user_id,
            task_id: req.task_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(TaskResponse::from(&task))))
}
