//! Scene Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Description, Dialogue, SceneError, SceneStatus};

/// Scene 聚合根
///
/// 不变量:
/// - 持久化前描述非空
/// - character_ids 去重并保持插入顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub(crate) id: Uuid,
    pub(crate) chapter_id: Uuid,
    pub(crate) novel_id: Uuid,
    pub(crate) number: u32,
    pub(crate) location: Option<String>,
    pub(crate) time_of_day: Option<String>,
    pub(crate) description: Description,
    pub(crate) dialogues: Vec<Dialogue>,
    pub(crate) character_ids: Vec<Uuid>,
    pub(crate) image_prompt: Option<String>,
    pub(crate) video_prompt: Option<String>,
    pub(crate) status: SceneStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Scene {
    pub fn new(chapter_id: Uuid, novel_id: Uuid, number: u32) -> Result<Self, SceneError> {
        if number == 0 {
            return Err(SceneError::InvalidNumber);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            chapter_id,
            novel_id,
            number,
            location: None,
            time_of_day: None,
            description: Description::default(),
            dialogues: Vec::new(),
            character_ids: Vec::new(),
            image_prompt: None,
            video_prompt: None,
            status: SceneStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_description(&mut self, description: Description) -> Result<(), SceneError> {
        if description.is_empty() {
            return Err(SceneError::EmptyDescription);
        }
        self.description = description;
        self.touch();
        Ok(())
    }

    pub fn set_dialogues(&mut self, dialogues: Vec<Dialogue>) {
        self.dialogues = dialogues;
        self.touch();
    }

    pub fn add_character(&mut self, character_id: Uuid) {
        if !self.character_ids.contains(&character_id) {
            self.character_ids.push(character_id);
            self.touch();
        }
    }

    /// 替换角色列表（去重，保持顺序）
    pub fn set_characters(&mut self, character_ids: impl IntoIterator<Item = Uuid>) {
        self.character_ids.clear();
        for id in character_ids {
            if !self.character_ids.contains(&id) {
                self.character_ids.push(id);
            }
        }
        self.touch();
    }

    /// 空白值视为未设置
    pub fn set_location(&mut self, location: &str) {
        self.location = non_blank(location);
        self.touch();
    }

    pub fn set_time_of_day(&mut self, time_of_day: &str) {
        self.time_of_day = non_blank(time_of_day);
        self.touch();
    }

    pub fn set_image_prompt(&mut self, prompt: impl Into<String>) {
        self.image_prompt = Some(prompt.into());
        self.touch();
    }

    pub fn set_video_prompt(&mut self, prompt: impl Into<String>) {
        self.video_prompt = Some(prompt.into());
        self.touch();
    }

    pub fn set_status(&mut self, status: SceneStatus) {
        self.status = status;
        self.touch();
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.description.is_empty() {
            return Err(SceneError::EmptyDescription);
        }
        Ok(())
    }

    pub fn has_characters(&self) -> bool {
        !self.character_ids.is_empty()
    }

    pub fn has_dialogues(&self) -> bool {
        !self.dialogues.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chapter_id(&self) -> Uuid {
        self.chapter_id
    }

    pub fn novel_id(&self) -> Uuid {
        self.novel_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn time_of_day(&self) -> Option<&str> {
        self.time_of_day.as_deref()
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn dialogues(&self) -> &[Dialogue] {
        &self.dialogues
    }

    pub fn character_ids(&self) -> &[Uuid] {
        &self.character_ids
    }

    pub fn image_prompt(&self) -> Option<&str> {
        self.image_prompt.as_deref()
    }

    pub fn video_prompt(&self) -> Option<&str> {
        self.video_prompt.as_deref()
    }

    pub fn status(&self) -> SceneStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::new(Uuid::new_v4(), Uuid::new_v4(), 1).unwrap()
    }

    #[test]
    fn test_new_scene_has_no_description() {
        let scene = scene();
        assert_eq!(scene.status(), SceneStatus::Pending);
        assert!(matches!(scene.validate(), Err(SceneError::EmptyDescription)));
    }

    #[test]
    fn test_single_char_full_text_rejected() {
        let mut scene = scene();
        assert!(scene.set_description(Description::from_text("A")).is_err());
    }

    #[test]
    fn test_setting_only_validates() {
        let mut scene = scene();
        scene
            .set_description(Description {
                setting: "forest".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_character_ids_deduplicated() {
        let mut scene = scene();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        scene.add_character(a);
        scene.add_character(b);
        scene.add_character(a);
        assert_eq!(scene.character_ids(), &[a, b]);

        scene.set_characters([b, b, a]);
        assert_eq!(scene.character_ids(), &[b, a]);
    }

    #[test]
    fn test_blank_location_unset() {
        let mut scene = scene();
        scene.set_location("  ");
        assert_eq!(scene.location(), None);
        scene.set_location(" 森林 ");
        assert_eq!(scene.location(), Some("森林"));
    }
}
