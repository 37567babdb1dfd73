//! Novel Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NovelError {
    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("无效的文本内容: {0}")]
    InvalidContent(String),

    #[error("章节解析失败: {0}")]
    ParseFailed(String),

    #[error("无效的章节: {0}")]
    InvalidChapter(String),
}
