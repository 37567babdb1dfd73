//! Character Context - Value Objects

use serde::{Deserialize, Serialize};

/// 角色定位
///
/// 强弱顺序: main > supporting > minor，提取过程中只会升级不会降级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRole {
    Main,
    Supporting,
    Minor,
}

impl CharacterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterRole::Main => "main",
            CharacterRole::Supporting => "supporting",
            CharacterRole::Minor => "minor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "main" => Some(CharacterRole::Main),
            "supporting" => Some(CharacterRole::Supporting),
            "minor" => Some(CharacterRole::Minor),
            _ => None,
        }
    }

    /// 角色强度，数值越大越重要
    pub fn strength(&self) -> u8 {
        match self {
            CharacterRole::Main => 3,
            CharacterRole::Supporting => 2,
            CharacterRole::Minor => 1,
        }
    }

    /// 取两者中更强的一个
    pub fn stronger(self, other: CharacterRole) -> CharacterRole {
        if other.strength() > self.strength() {
            other
        } else {
            self
        }
    }
}

/// 外貌
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub physical_traits: String,
    pub clothing_style: String,
    pub distinct_features: String,
    pub age: String,
    pub height: String,
}

impl Appearance {
    pub fn is_empty(&self) -> bool {
        [
            &self.physical_traits,
            &self.clothing_style,
            &self.distinct_features,
            &self.age,
            &self.height,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }

    /// 提示词形式: 年龄、身高、体貌、服装、特征，按顺序以 ", " 连接
    pub fn to_prompt(&self) -> String {
        [
            &self.age,
            &self.height,
            &self.physical_traits,
            &self.clothing_style,
            &self.distinct_features,
        ]
        .iter()
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// 用 `other` 填补本对象的空字段
    pub(crate) fn fill_from(&mut self, other: &Appearance) {
        fill(&mut self.physical_traits, &other.physical_traits);
        fill(&mut self.clothing_style, &other.clothing_style);
        fill(&mut self.distinct_features, &other.distinct_features);
        fill(&mut self.age, &other.age);
        fill(&mut self.height, &other.height);
    }
}

/// 性格
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub traits: Vec<String>,
    pub motivation: String,
    pub background: String,
}

impl Personality {
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty() && self.motivation.trim().is_empty() && self.background.trim().is_empty()
    }

    pub(crate) fn fill_from(&mut self, other: &Personality) {
        if self.traits.is_empty() {
            self.traits = other.traits.clone();
        }
        fill(&mut self.motivation, &other.motivation);
        fill(&mut self.background, &other.background);
    }
}

pub(crate) fn fill(target: &mut String, source: &str) {
    if target.trim().is_empty() && !source.trim().is_empty() {
        *target = source.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_never_downgrades() {
        assert_eq!(
            CharacterRole::Main.stronger(CharacterRole::Minor),
            CharacterRole::Main
        );
        assert_eq!(
            CharacterRole::Minor.stronger(CharacterRole::Supporting),
            CharacterRole::Supporting
        );
    }

    #[test]
    fn test_appearance_prompt_order() {
        let appearance = Appearance {
            physical_traits: "黑发".to_string(),
            clothing_style: "长袍".to_string(),
            distinct_features: String::new(),
            age: "少年".to_string(),
            height: "tall".to_string(),
        };
        assert_eq!(appearance.to_prompt(), "少年, tall, 黑发, 长袍");
    }

    #[test]
    fn test_appearance_empty_checks_every_field() {
        let mut appearance = Appearance::default();
        assert!(appearance.is_empty());

        appearance.height = "tall".to_string();
        assert!(!appearance.is_empty());
    }

    #[test]
    fn test_fill_keeps_existing_values() {
        let mut target = Appearance {
            physical_traits: "短发".to_string(),
            ..Default::default()
        };
        let source = Appearance {
            physical_traits: "长发".to_string(),
            clothing_style: "白衣".to_string(),
            ..Default::default()
        };
        target.fill_from(&source);

        assert_eq!(target.physical_traits, "短发");
        assert_eq!(target.clothing_style, "白衣");
    }
}
