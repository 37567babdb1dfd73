//! Task Manager Port - 生成任务调度
//!
//! 有界工作队列 + 进程内取消通知。
//! 取消以持久化的任务状态为准，这里的取消令牌只用于尽快唤醒正在执行的流程。

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 队列错误
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Work queue is full")]
    Full,

    #[error("Work queue is closed")]
    Closed,
}

/// Task Manager Port
pub trait TaskManagerPort: Send + Sync {
    /// 队列是否还有空位
    fn has_capacity(&self) -> bool;

    /// 将任务放入工作队列（不等待）
    fn enqueue(&self, task_id: Uuid) -> Result<(), QueueError>;

    /// 为即将执行的任务登记取消令牌
    fn register(&self, task_id: Uuid) -> CancellationToken;

    /// 通知正在执行的任务尽快停止，返回是否存在对应令牌
    fn signal_cancel(&self, task_id: Uuid) -> bool;

    /// 是否已收到取消通知
    fn is_cancel_signalled(&self, task_id: Uuid) -> bool;

    /// 任务结束后释放令牌
    fn release(&self, task_id: Uuid);
}
