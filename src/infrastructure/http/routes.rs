//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping               GET   健康检查
//! - /api/task/create        POST  创建生成任务
//! - /api/task/status        POST  查询任务状态
//! - /api/task/list          POST  任务列表（分页）
//! - /api/task/cancel        POST  取消任务
//! - /api/character/list     POST  小说角色列表
//! - /api/character/update   POST  更新角色
//! - /api/character/merge    POST  合并重复角色
//! - /api/scene/list         POST  场景列表
//! - /api/scene/enhance      POST  补全场景信息
//! - /api/scene/prompt       POST  生成图像 / 视频提示词
//!
//! task 接口需要 X-User-Id 请求头

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/task", task_routes())
        .nest("/character", character_routes())
        .nest("/scene", scene_routes())
}

/// Task 路由
fn task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_task))
        .route("/status", post(handlers::get_task_status))
        .route("/list", post(handlers::list_tasks))
        .route("/cancel", post(handlers::cancel_task))
}

/// Character 路由
fn character_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", post(handlers::list_characters))
        .route("/update", post(handlers::update_character))
        .route("/merge", post(handlers::merge_characters))
}

/// Scene 路由
fn scene_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", post(handlers::list_scenes))
        .route("/enhance", post(handlers::enhance_scene))
        .route("/prompt", post(handlers::generate_scene_prompts))
}
