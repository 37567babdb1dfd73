//! Image Generator Port - 图像生成服务抽象
//!
//! 定义外部图像生成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// 图像生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Rate limited by generation service")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error (status {status}): {message}")]
    Service { status: u16, message: String },
}

/// 文生图请求
#[derive(Debug, Clone)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub style: String,
    pub width: u32,
    pub height: u32,
}

/// 图生图请求
#[derive(Debug, Clone)]
pub struct ImageToImageRequest {
    pub reference_url: String,
    pub prompt: String,
    /// 参考图影响强度 (0, 1]
    pub strength: f32,
    pub width: u32,
    pub height: u32,
}

/// 生成结果
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    /// 服务端改写后的提示词（如有）
    pub revised_prompt: Option<String>,
    /// 服务端生成 ID（用于追踪）
    pub generation_id: Option<String>,
}

/// Image Generator Port
#[async_trait]
pub trait ImageGeneratorPort: Send + Sync {
    /// 文生图
    async fn text_to_image(&self, request: TextToImageRequest) -> Result<GeneratedImage, GenerationError>;

    /// 以参考图生成
    async fn image_to_image(&self, request: ImageToImageRequest) -> Result<GeneratedImage, GenerationError>;

    /// 检查生成服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
