//! Scene Context - Value Objects

use serde::{Deserialize, Serialize};

/// 场景状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    Pending,
    Ready,
    Generating,
    Completed,
    Failed,
}

impl SceneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneStatus::Pending => "pending",
            SceneStatus::Ready => "ready",
            SceneStatus::Generating => "generating",
            SceneStatus::Completed => "completed",
            SceneStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SceneStatus::Pending),
            "ready" => Some(SceneStatus::Ready),
            "generating" => Some(SceneStatus::Generating),
            "completed" => Some(SceneStatus::Completed),
            "failed" => Some(SceneStatus::Failed),
            _ => None,
        }
    }
}

/// 场景描述
///
/// 结构化字段（setting / action / atmosphere）与自由文本（full_text）至少有一项有效。
/// 结构化字段非空白即有效；自由文本需多于一个字符。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    pub setting: String,
    pub action: String,
    pub atmosphere: String,
    pub full_text: String,
}

impl Description {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            full_text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        let structured = [&self.setting, &self.action, &self.atmosphere]
            .iter()
            .any(|field| !field.trim().is_empty());
        let free_text = self.full_text.trim().chars().count() > 1;
        !structured && !free_text
    }

    /// 自由文本优先，否则以 ". " 连接结构化字段
    pub fn to_prompt(&self) -> String {
        if !self.full_text.trim().is_empty() {
            return self.full_text.clone();
        }
        [&self.setting, &self.action, &self.atmosphere]
            .iter()
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>()
            .join(". ")
    }
}

/// 对白
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    pub speaker: String,
    pub content: String,
    pub emotion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_char_text_is_empty() {
        assert!(Description::from_text("A").is_empty());
        assert!(Description::default().is_empty());
        assert!(!Description::from_text("AB").is_empty());
    }

    #[test]
    fn test_setting_alone_is_enough() {
        let description = Description {
            setting: "forest".to_string(),
            ..Default::default()
        };
        assert!(!description.is_empty());
        assert_eq!(description.to_prompt(), "forest");
    }

    #[test]
    fn test_structured_prompt_joined() {
        let description = Description {
            setting: "forest".to_string(),
            action: "running".to_string(),
            atmosphere: "tense".to_string(),
            full_text: String::new(),
        };
        assert_eq!(description.to_prompt(), "forest. running. tense");
    }
}
