//! HTTP Image Client - 调用外部图像生成 HTTP 服务
//!
//! 实现 ImageGeneratorPort，兼容 OpenAI 风格的图像接口
//!
//! POST {base_url}/images/generations
//! Request:  {"model": "...", "prompt": "...", "n": 1, "size": "WxH", "image"?: "url", "strength"?: 0.6}
//! Response: {"created": 0, "data": [{"url": "...", "b64_json": "...", "revised_prompt": "..."}]}

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{
    GeneratedImage, GenerationError, ImageGeneratorPort, ImageToImageRequest, TextToImageRequest,
};

/// 图像生成请求体 (JSON)
#[derive(Debug, Serialize)]
struct ImageHttpRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strength: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ImageHttpResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

/// HTTP 图像客户端配置
#[derive(Debug, Clone)]
pub struct HttpImageClientConfig {
    /// 服务基础 URL
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpImageClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: String::new(),
            model: "gemini-2.5-flash-image".to_string(),
            timeout_secs: 60,
        }
    }
}

impl HttpImageClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 图像生成客户端
pub struct HttpImageClient {
    client: Client,
    config: HttpImageClientConfig,
}

impl HttpImageClient {
    pub fn new(config: HttpImageClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn generations_url(&self) -> String {
        format!("{}/images/generations", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/models", self.config.base_url.trim_end_matches('/'))
    }

    async fn generate(&self, body: ImageHttpRequest<'_>) -> Result<GeneratedImage, GenerationError> {
        tracing::debug!(
            url = %self.generations_url(),
            size = %body.size,
            with_reference = body.image.is_some(),
            prompt_len = body.prompt.len(),
            "Sending image generation request"
        );

        let response = self
            .client
            .post(self.generations_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else if e.is_connect() {
                    GenerationError::Network(format!("Cannot connect to generation service: {}", e))
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Network(e.to_string())
            }
        })?;

        let image = interpret_response(status, retry_after, &text)?;
        tracing::info!(
            generation_id = ?image.generation_id,
            revised = image.revised_prompt.is_some(),
            "Image generated"
        );
        Ok(image)
    }
}

/// 解析服务响应
fn interpret_response(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> Result<GeneratedImage, GenerationError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GenerationError::RateLimited { retry_after_secs });
    }

    if !status.is_success() {
        let error = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
        let filtered = error
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .map(|code| code.contains("content_policy") || code.contains("safety"))
            .unwrap_or(false);
        let message = error
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.chars().take(200).collect());

        if filtered {
            return Err(GenerationError::ContentFiltered(message));
        }
        return Err(GenerationError::Service {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: ImageHttpResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    let first = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse("empty data array".to_string()))?;

    let url = match (first.url, first.b64_json) {
        (Some(url), _) if !url.trim().is_empty() => url,
        (_, Some(b64)) if !b64.trim().is_empty() => format!("data:image/png;base64,{}", b64),
        _ => {
            return Err(GenerationError::MalformedResponse(
                "no url or b64_json in response".to_string(),
            ))
        }
    };

    Ok(GeneratedImage {
        url,
        revised_prompt: first.revised_prompt.filter(|p| !p.is_empty()),
        generation_id: parsed.id,
    })
}

#[async_trait]
impl ImageGeneratorPort for HttpImageClient {
    async fn text_to_image(&self, request: TextToImageRequest) -> Result<GeneratedImage, GenerationError> {
        self.generate(ImageHttpRequest {
            model: &self.config.model,
            prompt: &request.prompt,
            n: 1,
            size: format!("{}x{}", request.width, request.height),
            style: Some(request.style.as_str()).filter(|s| !s.is_empty()),
            image: None,
            strength: None,
        })
        .await
    }

    async fn image_to_image(&self, request: ImageToImageRequest) -> Result<GeneratedImage, GenerationError> {
        self.generate(ImageHttpRequest {
            model: &self.config.model,
            prompt: &request.prompt,
            n: 1,
            size: format!("{}x{}", request.width, request.height),
            style: None,
            image: Some(&request.reference_url),
            strength: Some(request.strength).filter(|s| *s > 0.0),
        })
        .await
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HttpImageClientConfig::new("http://example.com/v1/", "sk-test")
            .with_model("img-1")
            .with_timeout(30);
        assert_eq!(config.model, "img-1");
        assert_eq!(config.timeout_secs, 30);

        let client = HttpImageClient::new(config).unwrap();
        assert_eq!(client.generations_url(), "http://example.com/v1/images/generations");
    }

    #[test]
    fn test_request_body_omits_absent_fields() {
        let body = ImageHttpRequest {
            model: "m",
            prompt: "p",
            n: 1,
            size: "1024x768".to_string(),
            style: None,
            image: Some("https://ref"),
            strength: Some(0.6),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["size"], "1024x768");
        assert_eq!(json["image"], "https://ref");
        assert!(json.get("style").is_none());
    }

    #[test]
    fn test_success_prefers_url() {
        let body = r#"{"id":"gen-1","data":[{"url":"https://img/1.png","revised_prompt":"better"}]}"#;
        let image = interpret_response(StatusCode::OK, None, body).unwrap();
        assert_eq!(image.url, "https://img/1.png");
        assert_eq!(image.revised_prompt.as_deref(), Some("better"));
        assert_eq!(image.generation_id.as_deref(), Some("gen-1"));
    }

    #[test]
    fn test_success_falls_back_to_b64() {
        let body = r#"{"data":[{"url":"","b64_json":"AAAA"}]}"#;
        let image = interpret_response(StatusCode::OK, None, body).unwrap();
        assert_eq!(image.url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            interpret_response(StatusCode::OK, None, r#"{"data":[]}"#),
            Err(GenerationError::MalformedResponse(_))
        ));
        assert!(matches!(
            interpret_response(StatusCode::OK, None, "not json"),
            Err(GenerationError::MalformedResponse(_))
        ));
        assert!(matches!(
            interpret_response(StatusCode::OK, None, r#"{"data":[{}]}"#),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_statuses() {
        assert!(matches!(
            interpret_response(StatusCode::TOO_MANY_REQUESTS, Some(7), ""),
            Err(GenerationError::RateLimited { retry_after_secs: Some(7) })
        ));

        let filtered = r#"{"error":{"code":"content_policy_violation","message":"blocked"}}"#;
        assert!(matches!(
            interpret_response(StatusCode::BAD_REQUEST, None, filtered),
            Err(GenerationError::ContentFiltered(m)) if m == "blocked"
        ));

        match interpret_response(StatusCode::BAD_GATEWAY, None, "upstream down") {
            Err(GenerationError::Service { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
