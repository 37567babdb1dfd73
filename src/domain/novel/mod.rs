//! Novel Context - 小说限界上下文
//!
//! 职责:
//! - 小说聚合管理（提交、校验、状态）
//! - 章节实体

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::Novel;
pub use entities::Chapter;
pub use errors::NovelError;
pub use value_objects::{NovelStatus, Title, MAX_TITLE_CHARS, MIN_CONTENT_CHARS, UNKNOWN_AUTHOR};
