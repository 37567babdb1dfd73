//! Domain Layer - 领域层
//!
//! 包含五个限界上下文:
//! - Novel Context: 小说与章节
//! - Character Context: 角色与角色提取
//! - Scene Context: 场景、场景划分与提示词
//! - Media Context: 生成的图像 / 视频记录
//! - Task Context: 生成任务状态机

pub mod character;
pub mod media;
pub mod novel;
pub mod rules;
pub mod scene;
pub mod task;

// 共享的章节切分器
mod text_segmenter;

pub use text_segmenter::{count_words, split_chapters, ChapterDraft, FULL_TEXT_TITLE};
