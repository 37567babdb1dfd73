//! Scene Command Handlers

use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{DivideChapter, EnhanceScene, GeneratePrompts, PromptKind};
use crate::application::error::ApplicationError;
use crate::application::ports::{CharacterRepositoryPort, SceneRepositoryPort};
use crate::domain::character::Character;
use crate::domain::scene::{PromptGenerator, Scene, SceneDivider};

// ============================================================================
// DivideChapter
// ============================================================================

/// DivideChapter Handler - 划分场景并整批保存
pub struct DivideChapterHandler {
    scene_repo: Arc<dyn SceneRepositoryPort>,
    divider: Arc<SceneDivider>,
}

impl DivideChapterHandler {
    pub fn new(scene_repo: Arc<dyn SceneRepositoryPort>, divider: Arc<SceneDivider>) -> Self {
        Self { scene_repo, divider }
    }

    pub async fn handle(&self, command: DivideChapter) -> Result<Vec<Scene>, ApplicationError> {
        let scenes = self
            .divider
            .divide(command.chapter_id, command.novel_id, &command.content)
            .map_err(|e| ApplicationError::business_rule(e.to_string()))?;

        self.scene_repo.save_batch(&scenes).await?;

        tracing::debug!(
            chapter_id = %command.chapter_id,
            scenes = scenes.len(),
            "Chapter divided"
        );

        Ok(scenes)
    }
}

// ============================================================================
// EnhanceScene
// ============================================================================

/// EnhanceScene Handler
pub struct EnhanceSceneHandler {
    scene_repo: Arc<dyn SceneRepositoryPort>,
    divider: Arc<SceneDivider>,
}

impl EnhanceSceneHandler {
    pub fn new(scene_repo: Arc<dyn SceneRepositoryPort>, divider: Arc<SceneDivider>) -> Self {
        Self { scene_repo, divider }
    }

    pub async fn handle(&self, command: EnhanceScene) -> Result<Scene, ApplicationError> {
        let mut scene = self
            .scene_repo
            .find_by_id(command.scene_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Scene", command.scene_id))?;

        self.divider.enhance(&mut scene, &command.character_ids);
        self.scene_repo.save(&scene).await?;

        Ok(scene)
    }
}

// ============================================================================
// GeneratePrompts
// ============================================================================

/// 单个场景的提示词结果
#[derive(Debug, Clone)]
pub struct ScenePrompt {
    pub scene_id: Uuid,
    pub image_prompt: String,
    pub video_prompt: Option<String>,
}

/// GeneratePrompts Handler - 生成并保存提示词
///
/// 场景逐个处理，遇到第一个保存失败即返回
pub struct GeneratePromptsHandler {
    scene_repo: Arc<dyn SceneRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
    generator: Arc<PromptGenerator>,
}

impl GeneratePromptsHandler {
    pub fn new(
        scene_repo: Arc<dyn SceneRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
        generator: Arc<PromptGenerator>,
    ) -> Self {
        Self {
            scene_repo,
            character_repo,
            generator,
        }
    }

    pub async fn handle(&self, command: GeneratePrompts) -> Result<Vec<ScenePrompt>, ApplicationError> {
        if command.scene_ids.is_empty() {
            return Err(ApplicationError::validation("scene_ids cannot be empty"));
        }

        let mut results = Vec::with_capacity(command.scene_ids.len());

        for scene_id in command.scene_ids {
            let mut scene = self
                .scene_repo
                .find_by_id(scene_id)
                .await?
                .ok_or_else(|| ApplicationError::not_found("Scene", scene_id))?;

            let characters = self.scene_characters(&scene).await?;

            let image_prompt = self.generator.image_prompt(&scene, &characters, &command.options);
            scene.set_image_prompt(image_prompt.clone());

            let video_prompt = match command.kind {
                PromptKind::Image => None,
                PromptKind::Video => {
                    let prompt = self.generator.video_prompt(&scene, &characters, &command.options);
                    scene.set_video_prompt(prompt.clone());
                    Some(prompt)
                }
            };

            self.scene_repo.save(&scene).await?;

            results.push(ScenePrompt {
                scene_id,
                image_prompt,
                video_prompt,
            });
        }

        Ok(results)
    }

    /// 按场景中的顺序取出场景角色
    async fn scene_characters(&self, scene: &Scene) -> Result<Vec<Character>, ApplicationError> {
        if !scene.has_characters() {
            return Ok(Vec::new());
        }

        let mut all = self.character_repo.find_by_novel(scene.novel_id()).await?;
        let mut ordered = Vec::with_capacity(scene.character_ids().len());
        for id in scene.character_ids() {
            if let Some(pos) = all.iter().position(|c| c.id() == *id) {
                ordered.push(all.swap_remove(pos));
            }
        }
        Ok(ordered)
    }
}
