//! Scene Commands

use uuid::Uuid;

use crate::domain::scene::PromptOptions;

/// 将章节划分为场景
#[derive(Debug, Clone)]
pub struct DivideChapter {
    pub chapter_id: Uuid,
    pub novel_id: Uuid,
    pub content: String,
}

/// 补全场景元数据并设置出场角色
#[derive(Debug, Clone)]
pub struct EnhanceScene {
    pub scene_id: Uuid,
    pub character_ids: Vec<Uuid>,
}

/// 提示词类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Image,
    Video,
}

/// 为一个或多个场景生成提示词
#[derive(Debug, Clone)]
pub struct GeneratePrompts {
    pub scene_ids: Vec<Uuid>,
    pub kind: PromptKind,
    pub options: PromptOptions,
}
