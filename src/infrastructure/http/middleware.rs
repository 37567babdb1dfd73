//! HTTP Middleware
//!
//! HTTP 状态码错误日志中间件

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::extract::USER_ID_HEADER;

/// HTTP 状态码错误日志中间件
///
/// 业务错误（errno != 0）统一返回 200，在 ApiError::into_response() 中记录；
/// 这里只处理框架层面的 4xx / 5xx，例如请求体无法解析
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            user_id = %user_id,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            user_id = %user_id,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request as HttpRequest, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use tower::util::ServiceExt;

    #[derive(serde::Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        task_id: uuid::Uuid,
    }

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn json_handler(Json(_): Json<Payload>) -> &'static str {
        "OK"
    }

    async fn error_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/ok", get(ok_handler))
            .route("/json", post(json_handler))
            .route("/error", get(error_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    #[tokio::test]
    async fn test_ok_response_passes_through() {
        let request = HttpRequest::builder()
            .uri("/ok")
            .header("X-User-Id", "alice")
            .body(Body::empty())
            .unwrap();

        let response = create_test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_rejection_is_client_error() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/json")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"task_id":"not-a-uuid"}"#))
            .unwrap();

        let response = create_test_router().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_server_error_passes_through() {
        let request = HttpRequest::builder()
            .uri("/error")
            .body(Body::empty())
            .unwrap();

        let response = create_test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
