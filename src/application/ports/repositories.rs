//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::character::Character;
use crate::domain::media::Media;
use crate::domain::novel::{Chapter, Novel};
use crate::domain::scene::Scene;
use crate::domain::task::{Task, TaskStatus};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Novel Repository
// ============================================================================

/// Novel Repository Port
///
/// `find_by_id` 返回的小说不含章节，章节通过 `find_chapters` 单独加载
#[async_trait]
pub trait NovelRepositoryPort: Send + Sync {
    /// 保存小说（存在则更新）
    async fn save(&self, novel: &Novel) -> Result<(), RepositoryError>;

    /// 根据 ID 查找小说
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Novel>, RepositoryError>;

    /// 批量保存章节（替换该小说已有章节）
    async fn save_chapters(&self, novel_id: Uuid, chapters: &[Chapter]) -> Result<(), RepositoryError>;

    /// 获取小说的所有章节（按序号）
    async fn find_chapters(&self, novel_id: Uuid) -> Result<Vec<Chapter>, RepositoryError>;
}

// ============================================================================
// Character Repository
// ============================================================================

/// Character Repository Port
#[async_trait]
pub trait CharacterRepositoryPort: Send + Sync {
    /// 保存角色（存在则更新）
    async fn save(&self, character: &Character) -> Result<(), RepositoryError>;

    /// 根据 ID 查找角色
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Character>, RepositoryError>;

    /// 获取小说的所有角色（按创建顺序）
    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Character>, RepositoryError>;

    /// 删除角色
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

// ============================================================================
// Scene Repository
// ============================================================================

/// Scene Repository Port
#[async_trait]
pub trait SceneRepositoryPort: Send + Sync {
    /// 保存场景（存在则更新）
    async fn save(&self, scene: &Scene) -> Result<(), RepositoryError>;

    /// 批量保存场景（单个事务，失败则全部回滚）
    async fn save_batch(&self, scenes: &[Scene]) -> Result<(), RepositoryError>;

    /// 根据 ID 查找场景
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Scene>, RepositoryError>;

    /// 获取章节的所有场景（按序号）
    async fn find_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<Scene>, RepositoryError>;

    /// 获取小说的所有场景（按章节、序号）
    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Scene>, RepositoryError>;
}

// ============================================================================
// Media Repository
// ============================================================================

/// Media Repository Port
#[async_trait]
pub trait MediaRepositoryPort: Send + Sync {
    /// 保存媒体记录（存在则更新）
    async fn save(&self, media: &Media) -> Result<(), RepositoryError>;

    /// 根据 ID 查找媒体
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Media>, RepositoryError>;

    /// 获取场景的所有媒体（按创建时间）
    async fn find_by_scene(&self, scene_id: Uuid) -> Result<Vec<Media>, RepositoryError>;

    /// 获取小说的所有媒体（按创建时间）
    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Media>, RepositoryError>;
}

// ============================================================================
// Task Repository
// ============================================================================

/// 任务分页查询条件
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub user_id: String,
    pub status: Option<TaskStatus>,
    /// 从 1 开始
    pub page: u32,
    pub page_size: u32,
}

impl TaskPage {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Task Repository Port
#[async_trait]
pub trait TaskRepositoryPort: Send + Sync {
    /// 保存新任务（存在则覆盖）
    async fn save(&self, task: &Task) -> Result<(), RepositoryError>;

    /// 更新任务
    ///
    /// 仅当已存储的任务尚未处于终态时写入，返回是否写入成功。
    /// 返回 false 表示任务已被取消或已结束。
    async fn update(&self, task: &Task) -> Result<bool, RepositoryError>;

    /// 根据 ID 查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError>;

    /// 根据 ID 和用户查找任务
    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Task>, RepositoryError>;

    /// 分页获取用户任务（按创建时间倒序），返回 (当前页, 总数)
    async fn find_by_user(&self, page: &TaskPage) -> Result<(Vec<Task>, u64), RepositoryError>;

    /// 获取指定状态的任务（按创建时间）
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError>;
}
