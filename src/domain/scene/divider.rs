//! 场景划分器
//!
//! 按段落扫描章节正文，遇到转场关键词且当前场景已足够长时切分新场景；
//! 对白、情绪、地点与时段均由规则表推断。

use regex::Regex;
use uuid::Uuid;

use super::{Description, Dialogue, Scene, SceneError};
use crate::domain::rules::{compile, exact, first_contained, DivisionRules, RuleError};

/// 从转场关键词后截取地点时的最大字符数
const MAX_LOCATION_CHARS: usize = 8;

/// 地点截取在这些字符处终止
const LOCATION_TERMINATORS: &[char] = &[
    '。', '，', ',', '!', '！', '?', '？', ';', '；', ':', '：', '、', '.',
];

/// 场景切分点
#[derive(Debug, Clone, PartialEq, Eq)]
struct Boundary {
    content: String,
    location: Option<String>,
    time_of_day: Option<String>,
}

#[derive(Debug, Clone)]
struct DialoguePattern {
    regex: Regex,
    speaker_group: usize,
    content_group: usize,
}

/// 场景划分器（规则编译一次，可重复使用）
#[derive(Debug, Clone)]
pub struct SceneDivider {
    dialogue_patterns: Vec<DialoguePattern>,
    rules: DivisionRules,
}

impl SceneDivider {
    pub fn new(rules: &DivisionRules) -> Result<Self, RuleError> {
        let dialogue_patterns = rules
            .dialogue_patterns
            .iter()
            .map(|rule| {
                Ok(DialoguePattern {
                    regex: compile(&rule.pattern)?,
                    speaker_group: rule.speaker_group,
                    content_group: rule.content_group,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        Ok(Self {
            dialogue_patterns,
            rules: rules.clone(),
        })
    }

    /// 将章节划分为场景，场景序号从 1 开始
    ///
    /// 无法构成有效描述的切分片段（如单个字符）会被跳过
    pub fn divide(
        &self,
        chapter_id: Uuid,
        novel_id: Uuid,
        content: &str,
    ) -> Result<Vec<Scene>, SceneError> {
        let mut scenes = Vec::new();

        for boundary in self.detect_boundaries(content) {
            let description = Description::from_text(boundary.content.as_str());
            if description.is_empty() {
                continue;
            }

            let mut scene = Scene::new(chapter_id, novel_id, scenes.len() as u32 + 1)?;
            scene.set_description(description)?;
            scene.set_dialogues(self.extract_dialogues(&boundary.content));
            if let Some(location) = &boundary.location {
                scene.set_location(location);
            }
            if let Some(time_of_day) = &boundary.time_of_day {
                scene.set_time_of_day(time_of_day);
            }
            scenes.push(scene);
        }

        Ok(scenes)
    }

    fn detect_boundaries(&self, content: &str) -> Vec<Boundary> {
        let mut paragraphs: Vec<&str> = content.split("\n\n").collect();
        if paragraphs.len() == 1 {
            paragraphs = content.split('\n').collect();
        }

        let mut boundaries = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;
        let mut location: Option<String> = None;
        let mut time_of_day: Option<String> = None;

        for para in paragraphs.into_iter().map(str::trim).filter(|p| !p.is_empty()) {
            let location_marker = self
                .rules
                .location_markers
                .iter()
                .find(|m| !m.is_empty() && para.contains(m.as_str()));
            let time_marker = self
                .rules
                .time_markers
                .iter()
                .find(|m| !m.is_empty() && para.contains(m.as_str()));

            let is_transition = location_marker.is_some() || time_marker.is_some();
            let new_location = location_marker.and_then(|m| extract_location(para, m));
            let new_time = time_marker
                .and_then(|m| exact(&self.rules.time_buckets, m))
                .map(str::to_string);

            if is_transition && current_chars > self.rules.min_scene_chars {
                boundaries.push(Boundary {
                    content: std::mem::take(&mut current),
                    location: location.take(),
                    time_of_day: time_of_day.take(),
                });
                current_chars = 0;
                location = new_location;
                time_of_day = new_time;
            } else {
                if new_location.is_some() {
                    location = new_location;
                }
                if new_time.is_some() {
                    time_of_day = new_time;
                }
            }

            if !current.is_empty() {
                current.push('\n');
                current_chars += 1;
            }
            current.push_str(para);
            current_chars += para.chars().count();
        }

        if !current.is_empty() {
            boundaries.push(Boundary {
                content: current,
                location,
                time_of_day,
            });
        }

        boundaries
    }

    /// 逐行提取对白，同一行内相同内容只记录一次
    pub fn extract_dialogues(&self, content: &str) -> Vec<Dialogue> {
        let mut dialogues = Vec::new();

        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut seen: Vec<String> = Vec::new();

            for pattern in &self.dialogue_patterns {
                for caps in pattern.regex.captures_iter(line) {
                    let (Some(speaker), Some(text)) = (
                        caps.get(pattern.speaker_group),
                        caps.get(pattern.content_group),
                    ) else {
                        continue;
                    };

                    let text = text.as_str().trim();
                    if text.chars().count() < self.rules.min_dialogue_chars {
                        continue;
                    }
                    if seen.iter().any(|s| s == text) {
                        continue;
                    }
                    seen.push(text.to_string());

                    dialogues.push(Dialogue {
                        speaker: speaker.as_str().to_string(),
                        content: text.to_string(),
                        emotion: self.detect_emotion(line),
                    });
                }
            }
        }

        dialogues
    }

    pub fn detect_emotion(&self, text: &str) -> String {
        first_contained(&self.rules.emotions, text)
            .unwrap_or(&self.rules.default_emotion)
            .to_string()
    }

    pub fn infer_location(&self, text: &str) -> String {
        first_contained(&self.rules.locations, text)
            .unwrap_or(&self.rules.default_location)
            .to_string()
    }

    pub fn infer_time_of_day(&self, text: &str) -> String {
        first_contained(&self.rules.time_buckets, text)
            .unwrap_or(&self.rules.default_time_of_day)
            .to_string()
    }

    /// 补全场景元数据：替换角色列表，并推断缺失的地点与时段
    pub fn enhance(&self, scene: &mut Scene, character_ids: &[Uuid]) {
        scene.set_characters(character_ids.iter().copied());

        let text = scene.description().full_text.clone();
        if scene.location().is_none() {
            scene.set_location(&self.infer_location(&text));
        }
        if scene.time_of_day().is_none() {
            scene.set_time_of_day(&self.infer_time_of_day(&text));
        }
    }
}

/// 截取关键词之后的地点文本（遇空白或标点终止）
fn extract_location(text: &str, marker: &str) -> Option<String> {
    let index = text.find(marker)?;
    let location: String = text[index + marker.len()..]
        .trim_start()
        .chars()
        .take_while(|c| !c.is_whitespace() && !LOCATION_TERMINATORS.contains(c))
        .take(MAX_LOCATION_CHARS)
        .collect();

    (!location.is_empty()).then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divider() -> SceneDivider {
        SceneDivider::new(&DivisionRules::default()).unwrap()
    }

    fn filler(n: usize) -> String {
        "风".repeat(n)
    }

    #[test]
    fn test_short_chapter_is_single_scene() {
        let scenes = divider()
            .divide(Uuid::new_v4(), Uuid::new_v4(), "他来到森林。\n\n天色渐暗。")
            .unwrap();

        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].number(), 1);
        assert_eq!(scenes[0].location(), Some("森林"));
    }

    #[test]
    fn test_transition_after_long_scene_splits() {
        let content = format!(
            "{}\n\n第二天清晨，他走进客厅。\n\n{}",
            filler(120),
            filler(10)
        );
        let scenes = divider()
            .divide(Uuid::new_v4(), Uuid::new_v4(), &content)
            .unwrap();

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].location(), None);
        assert_eq!(scenes[1].number(), 2);
        assert_eq!(scenes[1].location(), Some("客厅"));
        // 第二天 先于 清晨 命中，未映射到时段
        assert_eq!(scenes[1].time_of_day(), None);
        assert!(scenes[1].description().full_text.starts_with("第二天清晨"));
    }

    #[test]
    fn test_time_marker_seeds_bucket() {
        let content = format!("{}\n\n傍晚时分，风停了。", filler(120));
        let scenes = divider()
            .divide(Uuid::new_v4(), Uuid::new_v4(), &content)
            .unwrap();

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].time_of_day(), Some("evening"));
    }

    #[test]
    fn test_single_newline_fallback() {
        let content = format!("{}\n随后他离开了。", filler(120));
        let scenes = divider()
            .divide(Uuid::new_v4(), Uuid::new_v4(), &content)
            .unwrap();
        assert_eq!(scenes.len(), 2);
    }

    #[test]
    fn test_trailing_blank_paragraphs_still_close_scene() {
        let scenes = divider()
            .divide(Uuid::new_v4(), Uuid::new_v4(), "一段正文。\n\n\n\n")
            .unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].description().full_text, "一段正文。");
    }

    #[test]
    fn test_extract_dialogues_speaker_and_content() {
        let dialogues = divider().extract_dialogues(
            "张三笑道：“你好啊”\n“快走吧”，李四说\n王五：“嗯”\n赵六：“走吧走吧”",
        );

        assert_eq!(dialogues.len(), 3);
        assert_eq!(dialogues[0].speaker, "张三");
        assert_eq!(dialogues[0].content, "你好啊");
        assert_eq!(dialogues[0].emotion, "happy");
        assert_eq!(dialogues[1].speaker, "李四");
        assert_eq!(dialogues[1].content, "快走吧");
        assert_eq!(dialogues[1].emotion, "neutral");
        assert_eq!(dialogues[2].speaker, "赵六");
    }

    #[test]
    fn test_infer_defaults() {
        let divider = divider();
        assert_eq!(divider.infer_location("他在书房看书"), "书房");
        assert_eq!(divider.infer_location("无处可寻"), "未知地点");
        assert_eq!(divider.infer_time_of_day("月光洒下"), "night");
        assert_eq!(divider.infer_time_of_day("无"), "daytime");
    }

    #[test]
    fn test_enhance_fills_blanks_only() {
        let divider = divider();
        let mut scene = Scene::new(Uuid::new_v4(), Uuid::new_v4(), 1).unwrap();
        scene
            .set_description(Description::from_text("深夜的街道上空无一人"))
            .unwrap();
        scene.set_location("广场");

        let ids = [Uuid::new_v4()];
        divider.enhance(&mut scene, &ids);

        assert_eq!(scene.location(), Some("广场"));
        assert_eq!(scene.time_of_day(), Some("night"));
        assert_eq!(scene.character_ids(), &ids);
    }
}
