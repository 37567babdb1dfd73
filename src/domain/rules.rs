//! 启发式规则表
//!
//! 角色提取、场景划分、提示词生成所用的关键词表与正则表集中在此定义。
//! 所有表都有内置默认值，也可以整体或部分地从 TOML 文件覆盖：
//!
//! ```toml
//! [division]
//! min_scene_chars = 80
//!
//! [[division.emotions]]
//! keyword = "哽咽"
//! value = "sad"
//! ```
//!
//! 列表类规则按顺序匹配，先命中者生效。

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::character::CharacterRole;

/// CJK 统一表意文字范围（与提取规则中的 `[\x{4E00}-\x{9FA5}]` 对应）
const HAN: &str = r"[\x{4E00}-\x{9FA5}]";

/// 规则加载错误
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则文件读取失败: {0}")]
    Io(String),

    #[error("规则解析失败: {0}")]
    Parse(String),

    #[error("无效的正则表达式 `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// 关键词 → 取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub value: String,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
        }
    }
}

/// 多个关键词共享同一取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroupRule {
    pub keywords: Vec<String>,
    pub value: String,
}

impl KeywordGroupRule {
    pub fn new(keywords: &[&str], value: impl Into<String>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            value: value.into(),
        }
    }
}

/// 返回第一个关键词出现在 `text` 中的规则取值
pub fn first_contained<'a>(rules: &'a [KeywordRule], text: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| !rule.keyword.is_empty() && text.contains(rule.keyword.as_str()))
        .map(|rule| rule.value.as_str())
}

/// 返回关键词与 `key` 完全相等的规则取值
pub fn exact<'a>(rules: &'a [KeywordRule], key: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| rule.keyword == key)
        .map(|rule| rule.value.as_str())
}

/// 返回任一关键词出现在 `text` 中的第一组规则取值
pub fn first_group_contained<'a>(rules: &'a [KeywordGroupRule], text: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|k| !k.is_empty() && text.contains(k.as_str()))
        })
        .map(|rule| rule.value.as_str())
}

/// 编译正则，错误转换为 [`RuleError::InvalidPattern`]
pub fn compile(pattern: &str) -> Result<regex::Regex, RuleError> {
    regex::Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Character extraction
// ============================================================================

/// 角色名候选规则，第 1 个捕获组为候选名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePatternRule {
    pub pattern: String,
    pub role: CharacterRole,
}

/// 角色提取规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    pub name_patterns: Vec<NamePatternRule>,
    /// 常见非人名词（代词、时间连接词等）
    pub stop_words: Vec<String>,
    pub appearance_keywords: Vec<String>,
    /// 候选名在全文中出现的最少次数
    pub min_occurrences: usize,
    /// 排名第一之后可提升为 supporting 的名额
    pub supporting_slots: usize,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        let name_patterns = vec![
            NamePatternRule {
                pattern: format!("({HAN}{{2,4}}?)(?:说道|说|道|答|问|喊|叫|笑|哭|心想|暗想|想)"),
                role: CharacterRole::Minor,
            },
            NamePatternRule {
                pattern: format!("[“\"]({HAN}{{2,4}})[，,]"),
                role: CharacterRole::Minor,
            },
            NamePatternRule {
                pattern: format!("({HAN}{{2,4}}?)(?:心中|眼中|脸上|手中)"),
                role: CharacterRole::Minor,
            },
            NamePatternRule {
                pattern: format!("主角({HAN}{{2,4}})"),
                role: CharacterRole::Main,
            },
            NamePatternRule {
                pattern: format!("({HAN}{{2,4}}?)是(?:一个|一位|个)"),
                role: CharacterRole::Supporting,
            },
        ];

        Self {
            name_patterns,
            stop_words: strings(&[
                "他们", "她们", "我们", "这个", "那个", "什么", "怎么", "为什么", "如何", "现在",
                "然后", "接着", "突然", "忽然", "立刻", "马上", "一直", "总是", "已经", "正在",
                "刚刚", "于是", "因此", "所以",
            ]),
            appearance_keywords: strings(&[
                "长发", "短发", "黑发", "金发", "白发", "美丽", "英俊", "高大", "矮小", "瘦弱",
                "强壮", "眼睛", "面容", "身材", "穿着", "衣服", "年轻", "年老", "中年", "少年",
                "少女",
            ]),
            min_occurrences: 3,
            supporting_slots: 4,
        }
    }
}

// ============================================================================
// Scene division
// ============================================================================

/// 对白提取规则，分别指明说话人与内容所在的捕获组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialoguePatternRule {
    pub pattern: String,
    pub speaker_group: usize,
    pub content_group: usize,
}

/// 场景划分规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DivisionRules {
    pub location_markers: Vec<String>,
    pub time_markers: Vec<String>,
    /// 当前场景累计字符数超过该值时，转场关键词才会切分场景
    pub min_scene_chars: usize,
    pub dialogue_patterns: Vec<DialoguePatternRule>,
    /// 对白内容的最少字符数
    pub min_dialogue_chars: usize,
    pub emotions: Vec<KeywordRule>,
    pub default_emotion: String,
    /// 关键词 → 地点
    pub locations: Vec<KeywordRule>,
    pub default_location: String,
    /// 关键词 → 时段（morning / noon / afternoon / evening / night / midnight / daytime）
    pub time_buckets: Vec<KeywordRule>,
    pub default_time_of_day: String,
}

impl Default for DivisionRules {
    fn default() -> Self {
        let dialogue_patterns = vec![
            DialoguePatternRule {
                pattern: format!(
                    "({HAN}{{2,4}}?)(?:说|道|答|问|喊|叫|笑|哭)道?[:：，,]?\\s*[“\"]([^“”\"]+)[”\"]"
                ),
                speaker_group: 1,
                content_group: 2,
            },
            DialoguePatternRule {
                pattern: format!(
                    "[“\"]([^“”\"]+)[”\"][，,。]?\\s*({HAN}{{2,4}}?)(?:说|道|答|问)道?"
                ),
                speaker_group: 2,
                content_group: 1,
            },
            DialoguePatternRule {
                pattern: format!("({HAN}{{2,4}}?)[:：]\\s*[“\"]([^“”\"]+)[”\"]"),
                speaker_group: 1,
                content_group: 2,
            },
        ];

        let locations = [
            "房间", "卧室", "客厅", "书房", "厨房", "街道", "街上", "路上", "广场", "公园",
            "学校", "教室", "办公室", "商店", "山上", "森林", "河边", "海边",
        ]
        .iter()
        .map(|k| KeywordRule::new(*k, *k))
        .collect();

        Self {
            location_markers: strings(&[
                "来到", "进入", "走进", "到达", "回到", "离开", "前往", "去往", "出现在",
            ]),
            time_markers: strings(&[
                "第二天", "次日", "清晨", "早晨", "中午", "下午", "傍晚", "晚上", "深夜", "午夜",
                "天亮", "天黑", "黎明", "黄昏", "过了", "之后", "后来", "接着", "随后",
            ]),
            min_scene_chars: 100,
            dialogue_patterns,
            min_dialogue_chars: 2,
            emotions: vec![
                KeywordRule::new("笑", "happy"),
                KeywordRule::new("哭", "sad"),
                KeywordRule::new("喊", "angry"),
                KeywordRule::new("怒", "angry"),
                KeywordRule::new("惊", "surprised"),
                KeywordRule::new("叹", "sigh"),
                KeywordRule::new("激动", "excited"),
                KeywordRule::new("冷静", "calm"),
                KeywordRule::new("温柔", "gentle"),
            ],
            default_emotion: "neutral".to_string(),
            locations,
            default_location: "未知地点".to_string(),
            time_buckets: vec![
                KeywordRule::new("清晨", "morning"),
                KeywordRule::new("早晨", "morning"),
                KeywordRule::new("上午", "morning"),
                KeywordRule::new("黎明", "morning"),
                KeywordRule::new("天亮", "morning"),
                KeywordRule::new("中午", "noon"),
                KeywordRule::new("下午", "afternoon"),
                KeywordRule::new("傍晚", "evening"),
                KeywordRule::new("黄昏", "evening"),
                KeywordRule::new("晚上", "night"),
                KeywordRule::new("深夜", "night"),
                KeywordRule::new("天黑", "night"),
                KeywordRule::new("午夜", "midnight"),
                KeywordRule::new("阳光", "daytime"),
                KeywordRule::new("月光", "night"),
                KeywordRule::new("星空", "night"),
            ],
            default_time_of_day: "daytime".to_string(),
        }
    }
}

// ============================================================================
// Prompt generation
// ============================================================================

/// 提示词生成规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptRules {
    pub visual_keywords: Vec<String>,
    pub max_visual_terms: usize,
    /// 时段 → 光照描述（按时段精确匹配）
    pub lighting: Vec<KeywordRule>,
    pub default_lighting: String,
    /// 动作关键词 → 运镜/动作描述
    pub motions: Vec<KeywordGroupRule>,
    pub default_motion: String,
}

impl Default for PromptRules {
    fn default() -> Self {
        Self {
            visual_keywords: strings(&[
                "房间", "街道", "森林", "山", "河", "海", "明亮", "昏暗", "阳光", "月光", "红色",
                "蓝色", "绿色", "金色", "白色", "黑色", "大", "小", "高", "低", "宽", "窄",
            ]),
            max_visual_terms: 5,
            lighting: vec![
                KeywordRule::new("morning", "soft morning light, warm golden hour"),
                KeywordRule::new("noon", "bright midday sun, clear lighting"),
                KeywordRule::new("afternoon", "warm afternoon light"),
                KeywordRule::new("evening", "golden hour, sunset lighting"),
                KeywordRule::new("night", "moonlight, dark atmosphere, night scene"),
                KeywordRule::new("midnight", "very dark, minimal lighting, mysterious"),
                KeywordRule::new("daytime", "natural daylight, bright"),
            ],
            default_lighting: "natural lighting".to_string(),
            motions: vec![
                KeywordGroupRule::new(&["走", "跑"], "walking/running motion"),
                KeywordGroupRule::new(&["坐", "站"], "static pose with subtle movements"),
                KeywordGroupRule::new(&["打", "战"], "dynamic action, combat movements"),
                KeywordGroupRule::new(&["说", "笑"], "talking, facial expressions"),
            ],
            default_motion: "natural character movement".to_string(),
        }
    }
}

// ============================================================================
// RuleSet
// ============================================================================

/// 完整规则集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub extraction: ExtractionRules,
    pub division: DivisionRules,
    pub prompt: PromptRules,
}

impl RuleSet {
    /// 从 TOML 文本解析，未出现的表使用默认值
    pub fn from_toml_str(content: &str) -> Result<Self, RuleError> {
        toml::from_str(content).map_err(|e| RuleError::Parse(e.to_string()))
    }

    /// 从 TOML 文件加载
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_patterns_compile() {
        let rules = RuleSet::default();
        for rule in &rules.extraction.name_patterns {
            assert!(compile(&rule.pattern).is_ok(), "{}", rule.pattern);
        }
        for rule in &rules.division.dialogue_patterns {
            assert!(compile(&rule.pattern).is_ok(), "{}", rule.pattern);
        }
    }

    #[test]
    fn test_first_contained_respects_order() {
        let rules = vec![KeywordRule::new("笑", "happy"), KeywordRule::new("哭", "sad")];
        assert_eq!(first_contained(&rules, "又哭又笑"), Some("happy"));
        assert_eq!(first_contained(&rules, "沉默"), None);
    }

    #[test]
    fn test_exact_lookup() {
        let rules = PromptRules::default();
        assert_eq!(
            exact(&rules.lighting, "night"),
            Some("moonlight, dark atmosphere, night scene")
        );
        assert_eq!(exact(&rules.lighting, "nightfall"), None);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml = r#"
            [division]
            min_scene_chars = 40
            default_emotion = "calm"

            [[prompt.lighting]]
            keyword = "night"
            value = "neon city night"
        "#;
        let rules = RuleSet::from_toml_str(toml).unwrap();

        assert_eq!(rules.division.min_scene_chars, 40);
        assert_eq!(rules.division.default_emotion, "calm");
        // 未覆盖的字段保持默认
        assert_eq!(rules.division.location_markers.len(), 9);
        assert_eq!(rules.prompt.lighting.len(), 1);
        assert_eq!(rules.extraction.min_occurrences, 3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[extraction]\nmin_occurrences = 5").unwrap();

        let rules = RuleSet::load(file.path()).unwrap();
        assert_eq!(rules.extraction.min_occurrences, 5);
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let err = compile("([unclosed").unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }
}
