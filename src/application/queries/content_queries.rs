//! Character / Scene Queries

use uuid::Uuid;

/// 列出小说的角色
#[derive(Debug, Clone)]
pub struct ListCharacters {
    pub novel_id: Uuid,
}

/// 列出小说（或其中一章）的场景
#[derive(Debug, Clone)]
pub struct ListScenes {
    pub novel_id: Uuid,
    pub chapter_id: Option<Uuid>,
}
