//! Character HTTP Handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{ListCharacters, MergeCharacters, UpdateCharacter};
use crate::domain::character::{Appearance, CharacterRole, Personality};
use crate::infrastructure::http::dto::{ApiResponse, CharacterResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListCharactersRequest {
    pub novel_id: Uuid,
}

/// 只更新出现的字段
#[derive(Debug, Deserialize)]
pub struct UpdateCharacterRequest {
    pub character_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub appearance: Option<Appearance>,
    #[serde(default)]
    pub personality: Option<Personality>,
}

#[derive(Debug, Deserialize)]
pub struct MergeCharactersRequest {
    pub novel_id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_characters(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListCharactersRequest>,
) -> Result<Json<ApiResponse<Vec<CharacterResponse>>>, ApiError> {
    let characters = state
        .list_characters_handler
        .handle(ListCharacters {
            novel_id: req.novel_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(
        characters.iter().map(CharacterResponse::from).collect(),
    )))
}

pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateCharacterRequest>,
) -> Result<Json<ApiResponse<CharacterResponse>>, ApiError> {
    let role = match req.role.as_deref() {
        Some(s) => Some(
            CharacterRole::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown character role: {}", s)))?,
        ),
        None => None,
    };

    let character = state
        .update_character_handler
        .handle(UpdateCharacter {
            character_id: req.character_id,
            description: req.description,
            role,
            appearance: req.appearance,
            personality: req.personality,
        })
        .await?;

    Ok(Json(ApiResponse::success(CharacterResponse::from(&character))))
}

/// 合并重复角色，返回合并后的目标角色
pub async fn merge_characters(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MergeCharactersRequest>,
) -> Result<Json<ApiResponse<CharacterResponse>>, ApiError> {
    let character = state
        .merge_characters_handler
        .handle(MergeCharacters {
            novel_id: req.novel_id,
            source_id: req.source_id,
            target_id: req.target_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(CharacterResponse::from(&character))))
}
