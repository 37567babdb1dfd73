//! Ping Handler
//!
//! 健康检查，附带图像生成服务的可用性

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub generator: &'static str,
}

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PingResponse>> {
    let generator = if state.image_generator.health_check().await {
        "ok"
    } else {
        "unavailable"
    };

    Json(ApiResponse::success(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        generator,
    }))
}
