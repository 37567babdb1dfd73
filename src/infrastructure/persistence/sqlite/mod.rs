//! SQLite Persistence - SQLite 数据库持久化实现

mod character_repo;
mod database;
mod media_repo;
mod novel_repo;
mod scene_repo;
mod task_repo;

pub use character_repo::*;
pub use database::*;
pub use media_repo::*;
pub use novel_repo::*;
pub use scene_repo::*;
pub use task_repo::*;
