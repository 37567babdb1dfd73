//! Manvel - 小说转漫画生成服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Novel Context: 小说与章节切分
//! - Character Context: 角色提取与合并
//! - Scene Context: 场景划分与提示词生成
//! - Media Context: 生成的图像记录
//! - Task Context: 任务状态机与进度
//! - rules: 可从 TOML 加载的启发式规则表
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Repositories, ImageGenerator, TaskManager）
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//! - Workflow: 六步生成流程编排
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Memory: TaskManager 内存实现（工作队列 + 取消信号）
//! - Worker: WorkflowWorker 后台任务处理
//! - Persistence: SQLite 存储
//! - Adapters: 图像生成客户端（HTTP / Fake）

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
