//! Fake Image Client - 用于测试和离线运行的图像客户端
//!
//! 不调用任何外部服务，默认返回占位 URL；可预先编排每次调用的结果

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    GeneratedImage, GenerationError, ImageGeneratorPort, ImageToImageRequest, TextToImageRequest,
};

/// 记录的调用
#[derive(Debug, Clone)]
pub enum FakeCall {
    TextToImage(TextToImageRequest),
    ImageToImage(ImageToImageRequest),
}

/// Fake Image Client
pub struct FakeImageClient {
    /// 模拟生成延迟
    latency: Duration,
    base_url: String,
    counter: AtomicU64,
    script: Mutex<VecDeque<Result<GeneratedImage, GenerationError>>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl Default for FakeImageClient {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl FakeImageClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            base_url: "https://fake.manvel.local/images".to_string(),
            counter: AtomicU64::new(0),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一次调用的结果；编排用完后恢复默认成功
    pub fn push_outcome(&self, outcome: Result<GeneratedImage, GenerationError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// 追加一次失败
    pub fn push_failure(&self, error: GenerationError) {
        self.push_outcome(Err(error));
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn respond(&self, call: FakeCall) -> Result<GeneratedImage, GenerationError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(outcome) => outcome,
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(GeneratedImage {
                    url: format!("{}/{}.png", self.base_url, n),
                    revised_prompt: None,
                    generation_id: Some(format!("fake-{}", n)),
                })
            }
        }
    }
}

#[async_trait]
impl ImageGeneratorPort for FakeImageClient {
    async fn text_to_image(&self, request: TextToImageRequest) -> Result<GeneratedImage, GenerationError> {
        tracing::debug!(prompt_len = request.prompt.len(), "FakeImageClient: text to image");
        self.respond(FakeCall::TextToImage(request)).await
    }

    async fn image_to_image(&self, request: ImageToImageRequest) -> Result<GeneratedImage, GenerationError> {
        tracing::debug!(reference = %request.reference_url, "FakeImageClient: image to image");
        self.respond(FakeCall::ImageToImage(request)).await
    }
}
