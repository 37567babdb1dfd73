//! Novel Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NovelError;
use crate::domain::text_segmenter::ChapterDraft;

/// 章节
///
/// 不变量:
/// - number 在小说内从 1 开始连续
/// - 章节解析后不可变（除非重新解析）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub(crate) id: Uuid,
    pub(crate) novel_id: Uuid,
    pub(crate) number: u32,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) word_count: usize,
    pub(crate) created_at: DateTime<Utc>,
}

impl Chapter {
    pub fn new(
        novel_id: Uuid,
        number: u32,
        title: impl Into<String>,
        content: impl Into<String>,
        word_count: usize,
    ) -> Result<Self, NovelError> {
        if number == 0 {
            return Err(NovelError::InvalidChapter("章节序号从 1 开始".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            novel_id,
            number,
            title: title.into(),
            content: content.into(),
            word_count,
            created_at: Utc::now(),
        })
    }

    pub(crate) fn from_draft(novel_id: Uuid, draft: ChapterDraft) -> Result<Self, NovelError> {
        Self::new(
            novel_id,
            draft.number,
            draft.title,
            draft.content,
            draft.word_count,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn novel_id(&self) -> Uuid {
        self.novel_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
