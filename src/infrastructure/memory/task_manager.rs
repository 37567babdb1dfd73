//! In-Memory Task Manager Implementation

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{QueueError, TaskManagerPort};

/// 内存任务管理器
///
/// 工作队列为有界 mpsc 通道，容量即排队上限
pub struct InMemoryTaskManager {
    /// task_id -> 正在执行任务的取消令牌
    tokens: DashMap<Uuid, CancellationToken>,
    /// 任务队列发送端
    queue_sender: mpsc::Sender<Uuid>,
}

impl InMemoryTaskManager {
    pub fn new(queue_sender: mpsc::Sender<Uuid>) -> Self {
        Self {
            tokens: DashMap::new(),
            queue_sender,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 正在执行的任务数
    pub fn running(&self) -> usize {
        self.tokens.len()
    }
}

impl TaskManagerPort for InMemoryTaskManager {
    fn has_capacity(&self) -> bool {
        !self.queue_sender.is_closed() && self.queue_sender.capacity() > 0
    }

    fn enqueue(&self, task_id: Uuid) -> Result<(), QueueError> {
        self.queue_sender.try_send(task_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;

        tracing::debug!(task_id = %task_id, "Task enqueued");
        Ok(())
    }

    fn register(&self, task_id: Uuid) -> CancellationToken {
        self.tokens
            .entry(task_id)
            .or_insert_with(CancellationToken::new)
            .clone()
    }

    fn signal_cancel(&self, task_id: Uuid) -> bool {
        match self.tokens.get(&task_id) {
            Some(token) => {
                token.cancel();
                tracing::debug!(task_id = %task_id, "Cancellation signalled");
                true
            }
            None => false,
        }
    }

    fn is_cancel_signalled(&self, task_id: Uuid) -> bool {
        self.tokens
            .get(&task_id)
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    fn release(&self, task_id: Uuid) {
        self.tokens.remove(&task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_until_full() {
        let (tx, mut rx) = mpsc::channel(2);
        let manager = InMemoryTaskManager::new(tx);

        let first = Uuid::new_v4();
        assert!(manager.has_capacity());
        manager.enqueue(first).unwrap();
        manager.enqueue(Uuid::new_v4()).unwrap();

        assert!(!manager.has_capacity());
        assert!(matches!(manager.enqueue(Uuid::new_v4()), Err(QueueError::Full)));

        assert_eq!(rx.recv().await, Some(first));
        assert!(manager.has_capacity());
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let (tx, rx) = mpsc::channel(2);
        let manager = InMemoryTaskManager::new(tx);
        drop(rx);

        assert!(!manager.has_capacity());
        assert!(matches!(manager.enqueue(Uuid::new_v4()), Err(QueueError::Closed)));
    }

    #[test]
    fn test_cancel_signal_lifecycle() {
        let (tx, _rx) = mpsc::channel(1);
        let manager = InMemoryTaskManager::new(tx);
        let task_id = Uuid::new_v4();

        // 未执行的任务没有令牌
        assert!(!manager.signal_cancel(task_id));

        let token = manager.register(task_id);
        assert_eq!(manager.running(), 1);
        assert!(!manager.is_cancel_signalled(task_id));

        assert!(manager.signal_cancel(task_id));
        assert!(token.is_cancelled());
        assert!(manager.is_cancel_signalled(task_id));

        manager.release(task_id);
        assert_eq!(manager.running(), 0);
        assert!(!manager.is_cancel_signalled(task_id));
    }
}
