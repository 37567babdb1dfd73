//! Novel Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{MIN_CONTENT_CHARS, UNKNOWN_AUTHOR};
use super::{Chapter, NovelError, NovelStatus, Title};
use crate::domain::text_segmenter::{count_words, split_chapters};

/// Novel 聚合根
///
/// 不变量:
/// - 标题非空
/// - 解析前正文不少于 100 字符
/// - 章节序号从 1 开始连续
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Novel {
    pub(crate) id: Uuid,
    pub(crate) title: Title,
    pub(crate) author: String,
    pub(crate) content: String,
    pub(crate) status: NovelStatus,
    pub(crate) word_count: usize,
    pub(crate) chapters: Vec<Chapter>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Novel {
    /// 创建新小说（status = pending）
    pub fn new(title: &str, author: &str, content: impl Into<String>) -> Result<Self, NovelError> {
        let title = Title::new(title)?;
        let content = content.into();
        validate_content(&content)?;

        let author = match author.trim() {
            "" => UNKNOWN_AUTHOR.to_string(),
            other => other.to_string(),
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            author,
            word_count: count_words(&content),
            content,
            status: NovelStatus::Pending,
            chapters: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// 解析章节
    ///
    /// 状态 parsing → parsed；失败时置为 failed 并返回错误
    pub fn parse_chapters(&mut self) -> Result<&[Chapter], NovelError> {
        self.set_status(NovelStatus::Parsing);

        match self.build_chapters() {
            Ok(chapters) => {
                self.chapters = chapters;
                self.set_status(NovelStatus::Parsed);
                Ok(&self.chapters)
            }
            Err(e) => {
                self.set_status(NovelStatus::Failed);
                Err(e)
            }
        }
    }

    fn build_chapters(&self) -> Result<Vec<Chapter>, NovelError> {
        validate_content(&self.content)?;

        let mut drafts = split_chapters(&self.content);
        if drafts.is_empty() {
            return Err(NovelError::ParseFailed("未切分出任何章节".to_string()));
        }

        // 单章节回退时字数与全文一致
        if drafts.len() == 1 {
            drafts[0].word_count = self.word_count;
        }

        drafts
            .into_iter()
            .map(|draft| Chapter::from_draft(self.id, draft))
            .collect()
    }

    pub fn set_status(&mut self, status: NovelStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// 附加已持久化的章节（从仓储加载时使用）
    pub fn attach_chapters(&mut self, mut chapters: Vec<Chapter>) {
        chapters.sort_by_key(|c| c.number());
        self.chapters = chapters;
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> NovelStatus {
        self.status
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn validate_content(content: &str) -> Result<(), NovelError> {
    let chars = content.trim().chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(NovelError::InvalidContent(format!(
            "正文至少需要{}字符，当前{}字符",
            MIN_CONTENT_CHARS, chars
        )));
    }
    Ok(())
}
