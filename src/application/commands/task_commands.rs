//! Task Commands

use uuid::Uuid;

/// 提交小说并创建生成任务
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: String,
    pub title: String,
    pub author: String,
    pub content: String,
}

/// 取消任务
#[derive(Debug, Clone)]
pub struct CancelTask {
    pub user_id: String,
    pub task_id: Uuid,
}
