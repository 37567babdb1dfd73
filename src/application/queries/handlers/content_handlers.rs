//! Character / Scene Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{CharacterRepositoryPort, SceneRepositoryPort};
use crate::application::queries::{ListCharacters, ListScenes};
use crate::domain::character::Character;
use crate::domain::scene::Scene;

/// ListCharacters Handler
pub struct ListCharactersHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl ListCharactersHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(&self, query: ListCharacters) -> Result<Vec<Character>, ApplicationError> {
        Ok(self.character_repo.find_by_novel(query.novel_id).await?)
    }
}

/// ListScenes Handler
pub struct ListScenesHandler {
    scene_repo: Arc<dyn SceneRepositoryPort>,
}

impl ListScenesHandler {
    pub fn new(scene_repo: Arc<dyn SceneRepositoryPort>) -> Self {
        Self { scene_repo }
    }

    pub async fn handle(&self, query: ListScenes) -> Result<Vec<Scene>, ApplicationError> {
        let scenes = match query.chapter_id {
            Some(chapter_id) => self
                .scene_repo
                .find_by_chapter(chapter_id)
                .await?
                .into_iter()
                .filter(|s| s.novel_id() == query.novel_id)
                .collect(),
            None => self.scene_repo.find_by_novel(query.novel_id).await?,
        };
        Ok(scenes)
    }
}
