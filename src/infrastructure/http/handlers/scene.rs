//! Scene HTTP Handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{EnhanceScene, GeneratePrompts, ListScenes, PromptKind};
use crate::domain::scene::PromptOptions;
use crate::infrastructure::http::dto::{ApiResponse, ScenePromptResponse, SceneResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListScenesRequest {
    pub novel_id: Uuid,
    #[serde(default)]
    pub chapter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceSceneRequest {
    pub scene_id: Uuid,
    #[serde(default)]
    pub character_ids: Vec<Uuid>,
}

/// 单个 (scene_id) 或批量 (scene_ids)
#[derive(Debug, Deserialize)]
pub struct ScenePromptRequest {
    #[serde(default)]
    pub scene_id: Option<Uuid>,
    #[serde(default)]
    pub scene_ids: Vec<Uuid>,
    /// "image" | "video"，默认 image
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: Option<PromptOptions>,
}

impl ScenePromptRequest {
    fn into_command(self) -> Result<GeneratePrompts, ApiError> {
        let kind = match self.kind.as_deref().unwrap_or("image") {
            "image" => PromptKind::Image,
            "video" => PromptKind::Video,
            other => return Err(ApiError::BadRequest(format!("Unknown prompt kind: {}", other))),
        };

        let mut scene_ids = self.scene_ids;
        if let Some(id) = self.scene_id {
            if !scene_ids.contains(&id) {
                scene_ids.insert(0, id);
            }
        }

        Ok(GeneratePrompts {
            scene_ids,
            kind,
            options: self.options.unwrap_or_default(),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_scenes(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListScenesRequest>,
) -> Result<Json<ApiResponse<Vec<SceneResponse>>>, ApiError> {
    let scenes = state
        .list_scenes_handler
        .handle(ListScenes {
            novel_id: req.novel_id,
            chapter_id: req.chapter_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(
        scenes.iter().map(SceneResponse::from).collect(),
    )))
}

/// 补全场景的对白、地点、时间与出场角色
pub async fn enhance_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnhanceSceneRequest>,
) -> Result<Json<ApiResponse<SceneResponse>>, ApiError> {
    let scene = state
        .enhance_scene_handler
        .handle(EnhanceScene {
            scene_id: req.scene_id,
            character_ids: req.character_ids,
        })
        .await?;

    Ok(Json(ApiResponse::success(SceneResponse::from(&scene))))
}

pub async fn generate_scene_prompts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScenePromptRequest>,
) -> Result<Json<ApiResponse<Vec<ScenePromptResponse>>>, ApiError> {
    let prompts = state
        .generate_prompts_handler
        .handle(req.into_command()?)
        .await?;

    Ok(Json(ApiResponse::success(
        prompts.into_iter().map(ScenePromptResponse::from).collect(),
    )))
}
