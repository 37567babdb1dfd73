//! Media Context - 生成媒体（图像 / 视频）记录
//!
//! 状态流转: pending → generating → completed | failed，终态不可再变

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("媒体必须关联场景或小说")]
    MissingAssociation,

    #[error("无效的状态转换: {from} → {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("媒体 URL 不能为空")]
    EmptyUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Generating => "generating",
            MediaStatus::Completed => "completed",
            MediaStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MediaStatus::Pending),
            "generating" => Some(MediaStatus::Generating),
            "completed" => Some(MediaStatus::Completed),
            "failed" => Some(MediaStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaStatus::Completed | MediaStatus::Failed)
    }
}

/// 媒体元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaMetadata {
    pub width: u32,
    pub height: u32,
    pub duration_secs: Option<f64>,
    pub format: String,
    pub file_size: Option<u64>,
    /// "WxH"
    pub resolution: String,
}

impl MediaMetadata {
    pub fn image(width: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            width,
            height,
            duration_secs: None,
            format: format.into(),
            file_size: None,
            resolution: format!("{}x{}", width, height),
        }
    }

    pub fn video(width: u32, height: u32, duration_secs: f64, format: impl Into<String>) -> Self {
        Self {
            duration_secs: Some(duration_secs),
            ..Self::image(width, height, format)
        }
    }
}

/// Media 聚合根
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub(crate) id: Uuid,
    pub(crate) scene_id: Option<Uuid>,
    pub(crate) novel_id: Option<Uuid>,
    pub(crate) media_type: MediaType,
    pub(crate) status: MediaStatus,
    pub(crate) url: Option<String>,
    pub(crate) metadata: MediaMetadata,
    pub(crate) generation_id: Option<String>,
    pub(crate) error_message: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

impl Media {
    pub fn new(
        scene_id: Option<Uuid>,
        novel_id: Option<Uuid>,
        media_type: MediaType,
    ) -> Result<Self, MediaError> {
        if scene_id.is_none() && novel_id.is_none() {
            return Err(MediaError::MissingAssociation);
        }

        Ok(Self::build(scene_id, novel_id, media_type))
    }

    /// 场景图像
    pub fn scene_image(scene_id: Uuid, novel_id: Uuid) -> Self {
        Self::build(Some(scene_id), Some(novel_id), MediaType::Image)
    }

    fn build(scene_id: Option<Uuid>, novel_id: Option<Uuid>, media_type: MediaType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scene_id,
            novel_id,
            media_type,
            status: MediaStatus::Pending,
            url: None,
            metadata: MediaMetadata::default(),
            generation_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn mark_generating(&mut self) -> Result<(), MediaError> {
        self.transition(MediaStatus::Generating)?;
        Ok(())
    }

    pub fn mark_completed(
        &mut self,
        url: impl Into<String>,
        metadata: MediaMetadata,
        generation_id: Option<String>,
    ) -> Result<(), MediaError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(MediaError::EmptyUrl);
        }
        self.transition(MediaStatus::Completed)?;
        self.url = Some(url);
        self.metadata = metadata;
        if generation_id.is_some() {
            self.generation_id = generation_id;
        }
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), MediaError> {
        self.transition(MediaStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, to: MediaStatus) -> Result<(), MediaError> {
        let allowed = matches!(
            (self.status, to),
            (MediaStatus::Pending, MediaStatus::Generating)
                | (MediaStatus::Generating, MediaStatus::Completed)
                | (MediaStatus::Pending, MediaStatus::Failed)
                | (MediaStatus::Generating, MediaStatus::Failed)
        );
        if !allowed {
            return Err(MediaError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.status == MediaStatus::Completed
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scene_id(&self) -> Option<Uuid> {
        self.scene_id
    }

    pub fn novel_id(&self) -> Option<Uuid> {
        self.novel_id
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn status(&self) -> MediaStatus {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    pub fn generation_id(&self) -> Option<&str> {
        self.generation_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}
