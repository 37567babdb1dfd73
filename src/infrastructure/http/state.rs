//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    CancelTaskHandler, CreateTaskHandler, EnhanceSceneHandler, GeneratePromptsHandler,
    MergeCharactersHandler, UpdateCharacterHandler,
    // Query handlers
    GetTaskStatusHandler, ListCharactersHandler, ListScenesHandler, ListTasksHandler,
    // Ports
    ImageGeneratorPort, TaskManagerPort, WorkflowDeps,
};

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub image_generator: Arc<dyn ImageGeneratorPort>,
    pub task_manager: Arc<dyn TaskManagerPort>,

    // ========== Command Handlers ==========
    pub create_task_handler: CreateTaskHandler,
    pub cancel_task_handler: CancelTaskHandler,
    pub update_character_handler: UpdateCharacterHandler,
    pub merge_characters_handler: MergeCharactersHandler,
    pub enhance_scene_handler: EnhanceSceneHandler,
    pub generate_prompts_handler: GeneratePromptsHandler,

    // ========== Query Handlers ==========
    pub get_task_status_handler: GetTaskStatusHandler,
    pub list_tasks_handler: ListTasksHandler,
    pub list_characters_handler: ListCharactersHandler,
    pub list_scenes_handler: ListScenesHandler,
}

impl AppState {
    /// 使用与流程编排相同的依赖创建应用状态
    pub fn new(deps: &WorkflowDeps) -> Self {
        Self {
            // Ports
            image_generator: deps.image_generator.clone(),
            task_manager: deps.task_manager.clone(),

            // Command handlers
            create_task_handler: CreateTaskHandler::new(
                deps.novel_repo.clone(),
                deps.task_repo.clone(),
                deps.task_manager.clone(),
            ),
            cancel_task_handler: CancelTaskHandler::new(
                deps.task_repo.clone(),
                deps.task_manager.clone(),
            ),
            update_character_handler: UpdateCharacterHandler::new(deps.character_repo.clone()),
            merge_characters_handler: MergeCharactersHandler::new(deps.character_repo.clone()),
            enhance_scene_handler: EnhanceSceneHandler::new(
                deps.scene_repo.clone(),
                deps.heuristics.divider.clone(),
            ),
            generate_prompts_handler: GeneratePromptsHandler::new(
                deps.scene_repo.clone(),
                deps.character_repo.clone(),
                deps.heuristics.prompts.clone(),
            ),

            // Query handlers
            get_task_status_handler: GetTaskStatusHandler::new(
                deps.task_repo.clone(),
                deps.novel_repo.clone(),
                deps.character_repo.clone(),
                deps.scene_repo.clone(),
                deps.media_repo.clone(),
            ),
            list_tasks_handler: ListTasksHandler::new(deps.task_repo.clone()),
            list_characters_handler: ListCharactersHandler::new(deps.character_repo.clone()),
            list_scenes_handler: ListScenesHandler::new(deps.scene_repo.clone()),
        }
    }
}
