//! Character Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::fill;
use super::{Appearance, CharacterError, CharacterRole, Personality};

/// Character 聚合根
///
/// 不变量:
/// - name 去除空白后非空
/// - appearance 一旦设置，不能再被设置为全空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub(crate) id: Uuid,
    pub(crate) novel_id: Uuid,
    pub(crate) name: String,
    pub(crate) role: CharacterRole,
    pub(crate) appearance: Appearance,
    pub(crate) personality: Personality,
    pub(crate) description: String,
    pub(crate) reference_image_url: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Character {
    pub fn new(novel_id: Uuid, name: &str, role: CharacterRole) -> Result<Self, CharacterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CharacterError::EmptyName);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            novel_id,
            name: name.to_string(),
            role,
            appearance: Appearance::default(),
            personality: Personality::default(),
            description: String::new(),
            reference_image_url: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_appearance(&mut self, appearance: Appearance) -> Result<(), CharacterError> {
        if appearance.is_empty() {
            return Err(CharacterError::EmptyAppearance);
        }
        self.appearance = appearance;
        self.touch();
        Ok(())
    }

    pub fn set_personality(&mut self, personality: Personality) {
        self.personality = personality;
        self.touch();
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.trim().to_string();
        self.touch();
    }

    pub fn set_role(&mut self, role: CharacterRole) {
        self.role = role;
        self.touch();
    }

    pub fn set_reference_image(&mut self, url: impl Into<String>) {
        self.reference_image_url = Some(url.into());
        self.touch();
    }

    /// 合并另一个角色的信息，只填补本角色为空的字段
    pub fn absorb(&mut self, source: &Character) -> Result<(), CharacterError> {
        if source.id == self.id {
            return Err(CharacterError::SelfMerge);
        }
        if source.novel_id != self.novel_id {
            return Err(CharacterError::NovelMismatch);
        }

        self.appearance.fill_from(&source.appearance);
        self.personality.fill_from(&source.personality);
        fill(&mut self.description, &source.description);
        if self.reference_image_url.is_none() {
            self.reference_image_url = source.reference_image_url.clone();
        }
        self.role = self.role.stronger(source.role);
        self.touch();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CharacterError> {
        if self.name.trim().is_empty() {
            return Err(CharacterError::EmptyName);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn novel_id(&self) -> Uuid {
        self.novel_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> CharacterRole {
        self.role
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reference_image_url(&self) -> Option<&str> {
        self.reference_image_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_creation_trims_name() {
        let character = Character::new(Uuid::new_v4(), "  张三 ", CharacterRole::Minor).unwrap();
        assert_eq!(character.name(), "张三");
        assert!(character.appearance().is_empty());
        assert!(character.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Character::new(Uuid::new_v4(), "   ", CharacterRole::Main);
        assert!(matches!(result, Err(CharacterError::EmptyName)));
    }

    #[test]
    fn test_empty_appearance_rejected() {
        let mut character = Character::new(Uuid::new_v4(), "李四", CharacterRole::Main).unwrap();
        let result = character.set_appearance(Appearance::default());
        assert!(matches!(result, Err(CharacterError::EmptyAppearance)));
    }

    #[test]
    fn test_absorb_fills_gaps() {
        let novel_id = Uuid::new_v4();
        let mut target = Character::new(novel_id, "张三", CharacterRole::Minor).unwrap();
        target.set_description("主人公");

        let mut source = Character::new(novel_id, "小张", CharacterRole::Main).unwrap();
        source
            .set_appearance(Appearance {
                physical_traits: "黑发".to_string(),
                ..Default::default()
            })
            .unwrap();
        source.set_description("另一个描述");
        source.set_reference_image("http://img/1.png");

        target.absorb(&source).unwrap();

        assert_eq!(target.description(), "主人公");
        assert_eq!(target.appearance().physical_traits, "黑发");
        assert_eq!(target.reference_image_url(), Some("http://img/1.png"));
        assert_eq!(target.role(), CharacterRole::Main);
    }

    #[test]
    fn test_absorb_rejects_other_novel() {
        let mut target = Character::new(Uuid::new_v4(), "张三", CharacterRole::Minor).unwrap();
        let source = Character::new(Uuid::new_v4(), "李四", CharacterRole::Minor).unwrap();
        assert!(matches!(
            target.absorb(&source),
            Err(CharacterError::NovelMismatch)
        ));
    }
}
