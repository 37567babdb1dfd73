//! Workflow Worker - 后台生成任务处理器

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::{RunOutcome, WorkflowOrchestrator};
use crate::domain::task::ErrorCode;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct WorkflowWorkerConfig {
    /// 最大并发流程数
    pub max_concurrent: usize,
}

impl Default for WorkflowWorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 2 }
    }
}

/// 流程 Worker
///
/// 从队列消费任务 ID，在并发上限内执行生成流程
pub struct WorkflowWorker {
    config: WorkflowWorkerConfig,
    queue_receiver: mpsc::Receiver<Uuid>,
    orchestrator: Arc<WorkflowOrchestrator>,
}

impl WorkflowWorker {
    pub fn new(
        config: WorkflowWorkerConfig,
        queue_receiver: mpsc::Receiver<Uuid>,
        orchestrator: Arc<WorkflowOrchestrator>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            orchestrator,
        }
    }

    /// 启动 Worker，直到 shutdown 触发或队列关闭；退出前等待执行中的流程结束
    pub async fn run(mut self, shutdown: CancellationToken) {
        let max_concurrent = self.config.max_concurrent.max(1);
        tracing::info!(max_concurrent, "WorkflowWorker started");

        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        loop {
            let task_id = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue_receiver.recv() => match received {
                    Some(task_id) => task_id,
                    None => break,
                },
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    break;
                }
            };

            let orchestrator = self.orchestrator.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到流程结束
                Self::process_task(task_id, orchestrator).await;
            });
        }

        // 等待执行中的流程
        let _ = semaphore.acquire_many(max_concurrent as u32).await;
        tracing::info!("WorkflowWorker stopped");
    }

    async fn process_task(task_id: Uuid, orchestrator: Arc<WorkflowOrchestrator>) {
        let result = AssertUnwindSafe(orchestrator.execute(task_id))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) => match outcome {
                RunOutcome::Completed | RunOutcome::Skipped => {}
                RunOutcome::Failed(code) => {
                    tracing::warn!(task_id = %task_id, code = %code, "Task failed");
                }
                RunOutcome::Cancelled => {
                    tracing::info!(task_id = %task_id, "Task cancelled");
                }
            },
            Ok(Err(e)) => {
                tracing::error!(task_id = %task_id, error = %e, "Workflow aborted");
                if let Err(e) = orchestrator
                    .fail_task(task_id, ErrorCode::PERSISTENCE, &e.to_string())
                    .await
                {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to record task failure");
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(task_id = %task_id, panic = %message, "Workflow panicked");
                if let Err(e) = orchestrator.fail_after_panic(task_id, &message).await {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to record task failure");
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("internal error: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("internal error: {}", s)
    } else {
        "internal error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use crate::application::ports::{
        GeneratedImage, GenerationError, ImageGeneratorPort, ImageToImageRequest, TextToImageRequest,
    };
    use crate::application::workflow::test_support::{sample_novel, Fixture};
    use crate::domain::task::TaskStatus;
    use crate::infrastructure::adapters::FakeImageClient;

    struct PanickingGenerator;

    #[async_trait]
    impl ImageGeneratorPort for PanickingGenerator {
        async fn text_to_image(&self, _: TextToImageRequest) -> Result<GeneratedImage, GenerationError> {
            panic!("generator exploded")
        }

        async fn image_to_image(&self, _: ImageToImageRequest) -> Result<GeneratedImage, GenerationError> {
            panic!("generator exploded")
        }
    }

    #[tokio::test]
    async fn test_worker_runs_queued_tasks_and_drains() {
        let fx = Fixture::new(Arc::new(FakeImageClient::new(Duration::from_millis(5)))).await;
        let first = fx.seed_task(&sample_novel()).await;
        let second = fx.seed_task(&sample_novel()).await;

        let (tx, rx) = mpsc::channel(4);
        tx.send(first.id()).await.unwrap();
        tx.send(second.id()).await.unwrap();
        drop(tx);

        let worker = WorkflowWorker::new(WorkflowWorkerConfig::default(), rx, fx.orchestrator.clone());
        worker.run(CancellationToken::new()).await;

        assert_eq!(fx.stored(first.id()).await.status(), TaskStatus::Completed);
        assert_eq!(fx.stored(second.id()).await.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_failure() {
        let fx = Fixture::new(Arc::new(PanickingGenerator)).await;
        let task = fx.seed_task(&sample_novel()).await;

        let (tx, rx) = mpsc::channel(1);
        tx.send(task.id()).await.unwrap();
        drop(tx);

        let worker = WorkflowWorker::new(WorkflowWorkerConfig::default(), rx, fx.orchestrator.clone());
        worker.run(CancellationToken::new()).await;

        let stored = fx.stored(task.id()).await;
        assert_eq!(stored.status(), TaskStatus::Failed);
        assert_eq!(stored.error_code(), Some(ErrorCode::INTERNAL));
        assert!(stored.error_message().unwrap().contains("generator exploded"));
        assert_eq!(fx.task_manager.running(), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "internal error: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bad index"));
        assert_eq!(panic_message(payload.as_ref()), "internal error: bad index");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "internal error");
    }
}
