//! Task Queries

use uuid::Uuid;

use crate::domain::task::TaskStatus;

/// 默认每页条数
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 每页条数上限
pub const MAX_PAGE_SIZE: u32 = 100;

/// 查询任务状态（校验归属）
#[derive(Debug, Clone)]
pub struct GetTaskStatus {
    pub user_id: String,
    pub task_id: Uuid,
}

/// 分页列出用户任务
#[derive(Debug, Clone)]
pub struct ListTasks {
    pub user_id: String,
    pub page: u32,
    pub page_size: u32,
    pub status: Option<TaskStatus>,
}
