//! Task Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("用户 ID 不能为空")]
    EmptyUser,

    #[error("任务已处于终态: {0}")]
    AlreadyTerminal(&'static str),
}
