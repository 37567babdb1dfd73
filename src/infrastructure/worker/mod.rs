//! Worker Layer - Background Task Processing
//!
//! 实现 WorkflowWorker，在并发上限内执行生成流程

mod workflow_worker;

pub use workflow_worker::{WorkflowWorker, WorkflowWorkerConfig};
