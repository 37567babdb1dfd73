//! Task Context - 生成任务限界上下文
//!
//! 职责:
//! - 任务状态机（进度、失败、取消）
//! - 错误码与可重试判定

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::Task;
pub use errors::TaskError;
pub use value_objects::{
    ErrorCode, ProgressDetails, TaskStatus, WorkflowStep, TOTAL_STEPS, WAITING_STEP,
};
