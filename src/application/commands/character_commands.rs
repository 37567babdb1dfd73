//! Character Commands

use uuid::Uuid;

use crate::domain::character::{Appearance, CharacterRole, Personality};

/// 从小说正文提取角色
#[derive(Debug, Clone)]
pub struct ExtractCharacters {
    pub novel_id: Uuid,
    pub content: String,
}

/// 合并角色（source 并入 target，随后删除 source）
#[derive(Debug, Clone)]
pub struct MergeCharacters {
    pub novel_id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
}

/// 手动编辑角色，未提供的字段保持不变
#[derive(Debug, Clone, Default)]
pub struct UpdateCharacter {
    pub character_id: Uuid,
    pub description: Option<String>,
    pub role: Option<CharacterRole>,
    pub appearance: Option<Appearance>,
    pub personality: Option<Personality>,
}
