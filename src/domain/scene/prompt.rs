//! 提示词生成器
//!
//! 将场景与角色的结构化数据拼装为图像 / 视频生成提示词。

use serde::{Deserialize, Serialize};

use super::Scene;
use crate::domain::character::Character;
use crate::domain::rules::{exact, first_group_contained, PromptRules};

/// 画风
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    #[default]
    Anime,
    Realistic,
    Cartoon,
    Painting,
}

impl PromptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Anime => "anime",
            PromptStyle::Realistic => "realistic",
            PromptStyle::Cartoon => "cartoon",
            PromptStyle::Painting => "painting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "anime" => Some(PromptStyle::Anime),
            "realistic" => Some(PromptStyle::Realistic),
            "cartoon" => Some(PromptStyle::Cartoon),
            "painting" => Some(PromptStyle::Painting),
            _ => None,
        }
    }
}

/// 提示词选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOptions {
    pub style: PromptStyle,
    pub quality: String,
    pub aspect_ratio: String,
    pub negative: Vec<String>,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            style: PromptStyle::Anime,
            quality: "high quality, detailed".to_string(),
            aspect_ratio: "16:9".to_string(),
            negative: vec![
                "blurry".to_string(),
                "low quality".to_string(),
                "distorted".to_string(),
            ],
        }
    }
}

impl PromptOptions {
    pub fn with_style(mut self, style: PromptStyle) -> Self {
        self.style = style;
        self
    }
}

/// 提示词生成器
#[derive(Debug, Clone, Default)]
pub struct PromptGenerator {
    rules: PromptRules,
}

impl PromptGenerator {
    pub fn new(rules: PromptRules) -> Self {
        Self { rules }
    }

    /// 场景图像提示词
    pub fn image_prompt(
        &self,
        scene: &Scene,
        characters: &[Character],
        options: &PromptOptions,
    ) -> String {
        let description = scene.description();
        let mut parts = vec![format!("{} style", options.style.as_str())];

        if !description.setting.trim().is_empty() {
            parts.push(description.setting.trim().to_string());
        } else if !description.full_text.trim().is_empty() {
            let visual = self.visual_elements(&description.full_text);
            if !visual.is_empty() {
                parts.push(visual);
            }
        }

        if let Some(location) = scene.location() {
            parts.push(format!("location: {}", location));
        }

        if let Some(time_of_day) = scene.time_of_day() {
            parts.push(self.lighting(time_of_day).to_string());
        }

        for (i, character) in characters.iter().enumerate() {
            let label = if i == 0 {
                "main character".to_string()
            } else {
                format!("character {}", i + 1)
            };
            let appearance = character.appearance().to_prompt();
            if appearance.is_empty() {
                parts.push(format!("{}: {}", label, character.name()));
            } else {
                parts.push(format!("{}: {} ({})", label, character.name(), appearance));
            }
        }

        if !description.action.trim().is_empty() {
            parts.push(format!("action: {}", description.action.trim()));
        }
        if !description.atmosphere.trim().is_empty() {
            parts.push(format!("atmosphere: {}", description.atmosphere.trim()));
        }

        parts.push(options.quality.clone());

        let prompt = parts.join(", ");
        if options.negative.is_empty() {
            prompt
        } else {
            format!("{}. Negative: {}", prompt, options.negative.join(", "))
        }
    }

    /// 视频提示词：在图像提示词基础上追加动作、对白与运镜描述
    pub fn video_prompt(
        &self,
        scene: &Scene,
        characters: &[Character],
        options: &PromptOptions,
    ) -> String {
        let mut parts = vec![self.image_prompt(scene, characters, options)];

        let action = scene.description().action.trim();
        if !action.is_empty() {
            parts.push(format!("motion: {}", self.motion(action)));
        }
        if scene.has_dialogues() {
            parts.push("with dialogue and lip sync".to_string());
        }
        parts.push("smooth camera movement, cinematic".to_string());

        parts.join(", ")
    }

    /// 角色参考图（立绘）提示词
    pub fn portrait_prompt(&self, character: &Character, options: &PromptOptions) -> String {
        let style = options.style.as_str();
        let appearance = character.appearance();

        let mut parts = vec![format!("{} character portrait: {}", style, character.name())];
        if !appearance.physical_traits.trim().is_empty() {
            parts.push(appearance.physical_traits.trim().to_string());
        }
        if !appearance.clothing_style.trim().is_empty() {
            parts.push(format!("wearing {}", appearance.clothing_style.trim()));
        }
        if !appearance.age.trim().is_empty() {
            parts.push(appearance.age.trim().to_string());
        }
        if !character.description().is_empty() {
            parts.push(character.description().to_string());
        }
        parts.push(format!("high quality {} art style, detailed, clean background", style));

        parts.join(", ")
    }

    /// 以参考图保持角色一致性的提示词（图生图使用）
    pub fn optimize_for_consistency(&self, base_prompt: &str, reference_url: &str) -> String {
        format!(
            "maintain character consistency from reference image. {}. reference: {}",
            base_prompt, reference_url
        )
    }

    fn lighting(&self, time_of_day: &str) -> &str {
        exact(&self.rules.lighting, time_of_day).unwrap_or(&self.rules.default_lighting)
    }

    fn motion(&self, action: &str) -> &str {
        first_group_contained(&self.rules.motions, action).unwrap_or(&self.rules.default_motion)
    }

    /// 从自由文本中挑出含视觉关键词的词语
    fn visual_elements(&self, text: &str) -> String {
        text.split(|c: char| c.is_whitespace() || "。，！？；、,.!?;".contains(c))
            .filter(|word| !word.is_empty())
            .filter(|word| {
                self.rules
                    .visual_keywords
                    .iter()
                    .any(|k| !k.is_empty() && word.contains(k.as_str()))
            })
            .take(self.rules.max_visual_terms)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
