//! Novel Context - Value Objects

use serde::{Deserialize, Serialize};

use super::NovelError;

/// 标题最大字符数
pub const MAX_TITLE_CHARS: usize = 200;

/// 正文最少字符数
pub const MIN_CONTENT_CHARS: usize = 100;

/// 作者为空时使用的默认值
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// 小说标题（去除首尾空白，非空，不超过 200 字符）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl AsRef<str>) -> Result<Self, NovelError> {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return Err(NovelError::InvalidTitle("标题不能为空".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(NovelError::InvalidTitle(format!(
                "标题长度不能超过{}字符",
                MAX_TITLE_CHARS
            )));
        }
        Ok(Self(title.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 小说处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NovelStatus {
    /// 已提交，尚未解析
    Pending,
    /// 章节解析中
    Parsing,
    /// 章节已解析
    Parsed,
    /// 生成流程处理中
    Processing,
    /// 生成完成
    Completed,
    /// 失败
    Failed,
}

impl NovelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NovelStatus::Pending => "pending",
            NovelStatus::Parsing => "parsing",
            NovelStatus::Parsed => "parsed",
            NovelStatus::Processing => "processing",
            NovelStatus::Completed => "completed",
            NovelStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NovelStatus::Pending),
            "parsing" => Some(NovelStatus::Parsing),
            "parsed" => Some(NovelStatus::Parsed),
            "processing" => Some(NovelStatus::Processing),
            "completed" => Some(NovelStatus::Completed),
            "failed" => Some(NovelStatus::Failed),
            _ => None,
        }
    }
}

impl Default for NovelStatus {
    fn default() -> Self {
        NovelStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_trimmed() {
        let title = Title::new("  测试小说 ").unwrap();
        assert_eq!(title.as_str(), "测试小说");
    }

    #[test]
    fn test_title_rejects_blank() {
        assert!(Title::new("   ").is_err());
    }

    #[test]
    fn test_title_length_counts_chars() {
        assert!(Title::new("字".repeat(200)).is_ok());
        assert!(Title::new("字".repeat(201)).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            NovelStatus::Pending,
            NovelStatus::Parsing,
            NovelStatus::Parsed,
            NovelStatus::Processing,
            NovelStatus::Completed,
            NovelStatus::Failed,
        ] {
            assert_eq!(NovelStatus::from_str(status.as_str()), Some(status));
        }
    }
}
