//! Scene Context - 场景限界上下文
//!
//! 职责:
//! - 场景聚合管理（描述、对白、出场角色、提示词）
//! - 章节到场景的划分
//! - 图像 / 视频提示词生成

mod aggregate;
mod divider;
mod errors;
mod prompt;
mod value_objects;

pub use aggregate::Scene;
pub use divider::SceneDivider;
pub use errors::SceneError;
pub use prompt::{PromptGenerator, PromptOptions, PromptStyle};
pub use value_objects::{Description, Dialogue, SceneStatus};
