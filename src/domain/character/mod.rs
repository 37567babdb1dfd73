//! Character Context - 角色限界上下文
//!
//! 职责:
//! - 角色聚合管理（外貌、性格、参考图）
//! - 从小说正文中启发式提取角色

mod aggregate;
mod errors;
mod extractor;
mod value_objects;

pub use aggregate::Character;
pub use errors::CharacterError;
pub use extractor::{CharacterExtractor, ExtractedCharacter};
pub use value_objects::{Appearance, CharacterRole, Personality};
