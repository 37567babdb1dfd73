//! Memory Layer - In-Memory State Management
//!
//! 实现 TaskManager：工作队列入口与执行中任务的取消信号

mod task_manager;

pub use task_manager::InMemoryTaskManager;
