//! Request Extractors

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;

/// 调用方身份头
pub const USER_ID_HEADER: &str = "x-user-id";

/// 由上游网关注入的不透明用户 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;

        Ok(UserId(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<UserId, ApiError> {
        let (mut parts, _) = request.into_parts();
        UserId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_present() {
        let request = Request::builder()
            .header("X-User-Id", " alice ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), UserId("alice".to_string()));
    }

    #[tokio::test]
    async fn test_header_missing_or_blank() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(ApiError::Unauthorized(_))));

        let request = Request::builder().header("X-User-Id", "  ").body(()).unwrap();
        assert!(matches!(extract(request).await, Err(ApiError::Unauthorized(_))));
    }
}
