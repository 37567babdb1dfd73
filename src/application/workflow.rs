//! Workflow Orchestrator - 小说到漫画的生成流程
//!
//! 六个步骤严格顺序执行:
//! 1. 解析章节      5%
//! 2. 提取角色      15%
//! 3. 生成角色参考图 20% → 45%
//! 4. 划分场景      50% → 60%
//! 5. 生成场景图像  60% → 95%
//! 6. 完成          100%
//!
//! 每个步骤及每个条目开始前都会重新读取持久化的任务状态；
//! 任务已进入终态（通常是被取消）时立即停止，不再写入当前条目。
//! 所有进度写入都经过仓储的终态保护。

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::commands::handlers::{DivideChapterHandler, ExtractCharactersHandler};
use crate::application::commands::{DivideChapter, ExtractCharacters};
use crate::application::error::ApplicationError;
use crate::application::heuristics::Heuristics;
use crate::application::ports::{
    CharacterRepositoryPort, ImageGeneratorPort, ImageToImageRequest, MediaRepositoryPort,
    NovelRepositoryPort, RepositoryError, SceneRepositoryPort, TaskManagerPort,
    TaskRepositoryPort, TextToImageRequest,
};
use crate::domain::character::Character;
use crate::domain::media::{Media, MediaMetadata};
use crate::domain::novel::NovelStatus;
use crate::domain::scene::{
    PromptGenerator, PromptOptions, PromptStyle, Scene, SceneDivider, SceneStatus,
};
use crate::domain::task::{ErrorCode, ProgressDetails, Task, TaskStatus, WorkflowStep};

/// 生成图像的记录格式
const IMAGE_FORMAT: &str = "png";

/// 流程参数
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// 角色参考图边长
    pub portrait_size: u32,
    pub scene_width: u32,
    pub scene_height: u32,
    /// 图生图参考强度 (0, 1]
    pub reference_strength: f32,
    pub style: PromptStyle,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            portrait_size: 1024,
            scene_width: 1024,
            scene_height: 768,
            reference_strength: 0.6,
            style: PromptStyle::Anime,
        }
    }
}

/// 流程依赖
#[derive(Clone)]
pub struct WorkflowDeps {
    pub task_repo: Arc<dyn TaskRepositoryPort>,
    pub novel_repo: Arc<dyn NovelRepositoryPort>,
    pub character_repo: Arc<dyn CharacterRepositoryPort>,
    pub scene_repo: Arc<dyn SceneRepositoryPort>,
    pub media_repo: Arc<dyn MediaRepositoryPort>,
    pub image_generator: Arc<dyn ImageGeneratorPort>,
    pub task_manager: Arc<dyn TaskManagerPort>,
    pub heuristics: Heuristics,
}

/// 单次执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(ErrorCode),
    /// 被取消，或在执行期间被外部置为终态
    Cancelled,
    /// 任务不存在或已结束，未执行
    Skipped,
}

/// 流程中止原因
#[derive(Debug)]
enum Halt {
    Cancelled,
    Failed { code: ErrorCode, message: String },
}

impl Halt {
    fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        Halt::Failed {
            code,
            message: message.into(),
        }
    }

    fn persistence(err: RepositoryError) -> Self {
        Halt::failed(ErrorCode::PERSISTENCE, err.to_string())
    }

    /// 阶段处理器的错误：仓储失败归入持久化错误，其余使用阶段错误码
    fn stage(code: ErrorCode, err: ApplicationError) -> Self {
        match err {
            ApplicationError::RepositoryError(_) | ApplicationError::Conflict(_) => {
                Halt::failed(ErrorCode::PERSISTENCE, err.to_string())
            }
            other => Halt::failed(code, other.to_string()),
        }
    }
}

/// 按对白说话人匹配出场角色，每个角色最多一次
fn match_speakers(scene: &Scene, characters: &[Character]) -> Vec<Character> {
    characters
        .iter()
        .filter(|c| scene.dialogues().iter().any(|d| d.speaker == c.name()))
        .cloned()
        .collect()
}

/// start → end 区间内按完成比例插值
fn interpolate(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return end;
    }
    let span = usize::from(end - start);
    start + (span * done.min(total) / total) as u8
}

/// Workflow Orchestrator
pub struct WorkflowOrchestrator {
    task_repo: Arc<dyn TaskRepositoryPort>,
    novel_repo: Arc<dyn NovelRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
    scene_repo: Arc<dyn SceneRepositoryPort>,
    media_repo: Arc<dyn MediaRepositoryPort>,
    image_generator: Arc<dyn ImageGeneratorPort>,
    task_manager: Arc<dyn TaskManagerPort>,
    extract_handler: ExtractCharactersHandler,
    divide_handler: DivideChapterHandler,
    divider: Arc<SceneDivider>,
    prompts: Arc<PromptGenerator>,
    options: PromptOptions,
    settings: WorkflowSettings,
}

impl WorkflowOrchestrator {
    pub fn new(deps: WorkflowDeps, settings: WorkflowSettings) -> Self {
        Self {
            extract_handler: ExtractCharactersHandler::new(
                deps.character_repo.clone(),
                deps.heuristics.extractor.clone(),
            ),
            divide_handler: DivideChapterHandler::new(
                deps.scene_repo.clone(),
                deps.heuristics.divider.clone(),
            ),
            divider: deps.heuristics.divider,
            prompts: deps.heuristics.prompts,
            options: PromptOptions::default().with_style(settings.style),
            task_repo: deps.task_repo,
            novel_repo: deps.novel_repo,
            character_repo: deps.character_repo,
            scene_repo: deps.scene_repo,
            media_repo: deps.media_repo,
            image_generator: deps.image_generator,
            task_manager: deps.task_manager,
            settings,
        }
    }

    /// 执行任务（ExecuteTask）
    pub async fn execute(&self, task_id: Uuid) -> Result<RunOutcome, ApplicationError> {
        let Some(mut task) = self.task_repo.find_by_id(task_id).await? else {
            tracing::warn!(task_id = %task_id, "Task not found, skipping");
            return Ok(RunOutcome::Skipped);
        };
        if task.is_terminal() {
            tracing::debug!(
                task_id = %task_id,
                status = task.status().as_str(),
                "Task already finished, skipping"
            );
            return Ok(RunOutcome::Skipped);
        }

        tracing::info!(task_id = %task_id, novel_id = %task.novel_id(), "Workflow started");

        let token = self.task_manager.register(task_id);
        let result = self.run(&mut task, &token).await;
        self.task_manager.release(task_id);

        match result {
            Ok(()) => {
                tracing::info!(
                    task_id = %task_id,
                    characters = task.details().characters_generated,
                    scenes = task.details().scenes_generated,
                    "Workflow completed"
                );
                Ok(RunOutcome::Completed)
            }
            Err(Halt::Cancelled) => {
                tracing::info!(task_id = %task_id, "Workflow stopped by cancellation");
                Ok(RunOutcome::Cancelled)
            }
            Err(Halt::Failed { code, message }) => {
                tracing::error!(task_id = %task_id, code = %code, error = %message, "Workflow failed");
                self.fail(&mut task, code, &message).await
            }
        }
    }

    async fn run(&self, task: &mut Task, token: &CancellationToken) -> Result<(), Halt> {
        let task_id = task.id();
        let mut details = ProgressDetails::default();

        // ---- 1. 解析章节 ----
        self.checkpoint(task_id, token).await?;
        let mut novel = match self.novel_repo.find_by_id(task.novel_id()).await {
            Ok(Some(novel)) => novel,
            Ok(None) => {
                return Err(Halt::failed(
                    ErrorCode::NOVEL_LOAD,
                    format!("novel {} not found", task.novel_id()),
                ))
            }
            Err(e) => return Err(Halt::failed(ErrorCode::NOVEL_LOAD, e.to_string())),
        };

        if let Err(e) = novel.parse_chapters() {
            if let Err(save_err) = self.novel_repo.save(&novel).await {
                tracing::warn!(novel_id = %novel.id(), error = %save_err, "Failed to persist novel status");
            }
            return Err(Halt::failed(ErrorCode::NOVEL_PARSE, e.to_string()));
        }
        self.novel_repo
            .save_chapters(novel.id(), novel.chapters())
            .await
            .map_err(Halt::persistence)?;
        novel.set_status(NovelStatus::Processing);
        self.novel_repo.save(&novel).await.map_err(Halt::persistence)?;

        tracing::info!(task_id = %task_id, chapters = novel.chapters().len(), "Chapters parsed");
        self.progress(task, WorkflowStep::Segment, 5, details).await?;

        // ---- 2. 提取角色 ----
        self.checkpoint(task_id, token).await?;
        let created = self
            .extract_handler
            .handle(ExtractCharacters {
                novel_id: novel.id(),
                content: novel.content().to_string(),
            })
            .await
            .map_err(|e| Halt::stage(ErrorCode::CHARACTER_STAGE, e))?;
        details.characters_extracted = created.len() as u32;

        let mut characters = self
            .character_repo
            .find_by_novel(novel.id())
            .await
            .map_err(Halt::persistence)?;
        self.progress(task, WorkflowStep::Extract, 15, details).await?;

        // ---- 3. 生成角色参考图 ----
        self.progress(task, WorkflowStep::References, 20, details).await?;
        let total = characters.len();
        for (i, character) in characters.iter_mut().enumerate() {
            self.checkpoint(task_id, token).await?;
            self.generate_reference(character, token).await?;

            details.characters_generated += 1;
            let pct = interpolate(20, 45, i + 1, total);
            self.progress(task, WorkflowStep::References, pct, details).await?;
        }
        if total == 0 {
            self.progress(task, WorkflowStep::References, 45, details).await?;
        }

        // ---- 4. 划分场景 ----
        self.progress(task, WorkflowStep::Divide, 50, details).await?;
        let mut scenes = Vec::new();
        let total = novel.chapters().len();
        for (i, chapter) in novel.chapters().iter().enumerate() {
            self.checkpoint(task_id, token).await?;
            let divided = self
                .divide_handler
                .handle(DivideChapter {
                    chapter_id: chapter.id(),
                    novel_id: novel.id(),
                    content: chapter.content().to_string(),
                })
                .await
                .map_err(|e| Halt::stage(ErrorCode::SCENE_STAGE, e))?;

            details.scenes_divided += divided.len() as u32;
            scenes.extend(divided);
            let pct = interpolate(50, 60, i + 1, total);
            self.progress(task, WorkflowStep::Divide, pct, details).await?;
        }

        // ---- 5. 生成场景图像 ----
        self.progress(task, WorkflowStep::SceneImages, 60, details).await?;
        let total = scenes.len();
        for (i, scene) in scenes.iter_mut().enumerate() {
            self.checkpoint(task_id, token).await?;

            let present = match_speakers(scene, &characters);
            let ids: Vec<Uuid> = present.iter().map(|c| c.id()).collect();
            self.divider.enhance(scene, &ids);

            let prompt = self.prompts.image_prompt(scene, &present, &self.options);
            scene.set_image_prompt(prompt.clone());
            scene.set_status(SceneStatus::Generating);
            self.scene_repo.save(scene).await.map_err(Halt::persistence)?;

            let mut media = Media::scene_image(scene.id(), scene.novel_id());
            self.media_repo.save(&media).await.map_err(Halt::persistence)?;
            media
                .mark_generating()
                .map_err(|e| Halt::failed(ErrorCode::INTERNAL, e.to_string()))?;
            self.media_repo.save(&media).await.map_err(Halt::persistence)?;

            let reference = present
                .iter()
                .find_map(|c| c.reference_image_url().map(str::to_string));
            let request = async {
                match &reference {
                    Some(url) => {
                        self.image_generator
                            .image_to_image(ImageToImageRequest {
                                reference_url: url.clone(),
                                prompt: self.prompts.optimize_for_consistency(&prompt, url),
                                strength: self.settings.reference_strength,
                                width: self.settings.scene_width,
                                height: self.settings.scene_height,
                            })
                            .await
                    }
                    None => {
                        self.image_generator
                            .text_to_image(TextToImageRequest {
                                prompt: prompt.clone(),
                                style: self.options.style.as_str().to_string(),
                                width: self.settings.scene_width,
                                height: self.settings.scene_height,
                            })
                            .await
                    }
                }
            };

            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    if media.mark_failed("cancelled").is_ok() {
                        if let Err(e) = self.media_repo.save(&media).await {
                            tracing::warn!(media_id = %media.id(), error = %e, "Failed to persist media cancellation");
                        }
                    }
                    return Err(Halt::Cancelled);
                }
                outcome = request => outcome,
            };

            let completed = outcome.map_err(|e| e.to_string()).and_then(|image| {
                media
                    .mark_completed(
                        image.url,
                        MediaMetadata::image(
                            self.settings.scene_width,
                            self.settings.scene_height,
                            IMAGE_FORMAT,
                        ),
                        image.generation_id,
                    )
                    .map_err(|e| e.to_string())
            });

            if let Err(message) = completed {
                if media.mark_failed(message.clone()).is_ok() {
                    if let Err(e) = self.media_repo.save(&media).await {
                        tracing::warn!(media_id = %media.id(), error = %e, "Failed to persist media failure");
                    }
                }
                scene.set_status(SceneStatus::Failed);
                if let Err(e) = self.scene_repo.save(scene).await {
                    tracing::warn!(scene_id = %scene.id(), error = %e, "Failed to persist scene failure");
                }
                return Err(Halt::failed(
                    ErrorCode::SCENE_STAGE,
                    format!("scene {} image generation failed: {}", scene.number(), message),
                ));
            }

            self.media_repo.save(&media).await.map_err(Halt::persistence)?;
            scene.set_status(SceneStatus::Completed);
            self.scene_repo.save(scene).await.map_err(Halt::persistence)?;

            details.scenes_generated += 1;
            let pct = interpolate(60, 95, i + 1, total);
            self.progress(task, WorkflowStep::SceneImages, pct, details).await?;
        }
        if total == 0 {
            self.progress(task, WorkflowStep::SceneImages, 95, details).await?;
        }

        // ---- 6. 完成 ----
        self.checkpoint(task_id, token).await?;
        task.mark_completed().map_err(|_| Halt::Cancelled)?;
        if !self.task_repo.update(task).await.map_err(Halt::persistence)? {
            return Err(Halt::Cancelled);
        }

        novel.set_status(NovelStatus::Completed);
        if let Err(e) = self.novel_repo.save(&novel).await {
            // 任务已完成，不再回退为失败
            tracing::error!(novel_id = %novel.id(), error = %e, "Failed to mark novel completed");
        }

        Ok(())
    }

    /// 为尚无参考图的角色生成立绘
    async fn generate_reference(
        &self,
        character: &mut Character,
        token: &CancellationToken,
    ) -> Result<(), Halt> {
        if character.reference_image_url().is_some() {
            return Ok(());
        }

        let request = TextToImageRequest {
            prompt: self.prompts.portrait_prompt(character, &self.options),
            style: self.options.style.as_str().to_string(),
            width: self.settings.portrait_size,
            height: self.settings.portrait_size,
        };

        let image = tokio::select! {
            _ = token.cancelled() => return Err(Halt::Cancelled),
            outcome = self.image_generator.text_to_image(request) => outcome.map_err(|e| {
                Halt::failed(
                    ErrorCode::CHARACTER_STAGE,
                    format!("reference image for {} failed: {}", character.name(), e),
                )
            })?,
        };

        character.set_reference_image(image.url);
        self.character_repo
            .save(character)
            .await
            .map_err(Halt::persistence)?;

        tracing::debug!(character = %character.name(), "Reference image generated");
        Ok(())
    }

    /// 取消令牌已触发，或持久化状态已是终态时停止
    async fn checkpoint(&self, task_id: Uuid, token: &CancellationToken) -> Result<(), Halt> {
        if token.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        match self.task_repo.find_by_id(task_id).await {
            Ok(Some(stored)) if !stored.is_terminal() => Ok(()),
            Ok(_) => Err(Halt::Cancelled),
            Err(e) => Err(Halt::persistence(e)),
        }
    }

    async fn progress(
        &self,
        task: &mut Task,
        step: WorkflowStep,
        percentage: u8,
        details: ProgressDetails,
    ) -> Result<(), Halt> {
        task.update_progress(step, percentage, details)
            .map_err(|_| Halt::Cancelled)?;

        match self.task_repo.update(task).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Halt::Cancelled),
            Err(e) => Err(Halt::persistence(e)),
        }
    }

    async fn fail(
        &self,
        task: &mut Task,
        code: ErrorCode,
        message: &str,
    ) -> Result<RunOutcome, ApplicationError> {
        if task.mark_failed(code, message).is_err() {
            return Ok(RunOutcome::Cancelled);
        }
        if !self.task_repo.update(task).await? {
            return Ok(RunOutcome::Cancelled);
        }

        self.mark_novel_failed(task.novel_id()).await;
        Ok(RunOutcome::Failed(code))
    }

    async fn mark_novel_failed(&self, novel_id: Uuid) {
        match self.novel_repo.find_by_id(novel_id).await {
            Ok(Some(mut novel)) => {
                novel.set_status(NovelStatus::Failed);
                if let Err(e) = self.novel_repo.save(&novel).await {
                    tracing::warn!(novel_id = %novel_id, error = %e, "Failed to mark novel failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(novel_id = %novel_id, error = %e, "Failed to load novel"),
        }
    }

    /// 将未结束的任务置为失败，返回是否写入
    pub async fn fail_task(
        &self,
        task_id: Uuid,
        code: ErrorCode,
        message: &str,
    ) -> Result<bool, ApplicationError> {
        let Some(mut task) = self.task_repo.find_by_id(task_id).await? else {
            return Ok(false);
        };
        if task.mark_failed(code, message).is_err() {
            return Ok(false);
        }
        let written = self.task_repo.update(&task).await?;
        if written {
            self.mark_novel_failed(task.novel_id()).await;
        }
        Ok(written)
    }

    /// 执行过程中发生 panic 后调用
    pub async fn fail_after_panic(&self, task_id: Uuid, message: &str) -> Result<bool, ApplicationError> {
        self.task_manager.release(task_id);
        self.fail_task(task_id, ErrorCode::INTERNAL, message).await
    }

    /// 启动恢复：processing 任务置为中断失败，返回需要重新入队的 pending 任务
    pub async fn recover_interrupted(&self) -> Result<Vec<Uuid>, ApplicationError> {
        for mut task in self.task_repo.find_by_status(TaskStatus::Processing).await? {
            if task
                .mark_failed(ErrorCode::INTERRUPTED, "run interrupted by process restart")
                .is_ok()
                && self.task_repo.update(&task).await?
            {
                tracing::warn!(task_id = %task.id(), "Interrupted task marked failed");
                self.mark_novel_failed(task.novel_id()).await;
            }
        }

        let pending: Vec<Uuid> = self
            .task_repo
            .find_by_status(TaskStatus::Pending)
            .await?
            .iter()
            .map(Task::id)
            .collect();

        if !pending.is_empty() {
            tracing::info!(count = pending.len(), "Pending tasks recovered");
        }
        Ok(pending)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::sync::mpsc;

    use crate::domain::novel::Novel;
    use crate::domain::rules::RuleSet;
    use crate::infrastructure::memory::InMemoryTaskManager;
    use crate::infrastructure::persistence::sqlite::{
        test_pool, SqliteCharacterRepository, SqliteMediaRepository, SqliteNovelRepository,
        SqliteSceneRepository, SqliteTaskRepository,
    };

    /// 两章、两个角色（张三 main，李四 supporting），每章一个场景；
    /// 第二章只有张三说话，李四仅在旁白中出现
    pub(crate) fn sample_novel() -> String {
        let mut content = String::from("第一章 出发\n");
        content.push_str(&"张三说：\"我们出发吧。\"\n".repeat(4));
        content.push_str(&"李四问：\"去哪里？\"\n".repeat(3));
        content.push_str("第二章 森林\n");
        content.push_str(&"张三说：\"快走吧。\"\n".repeat(4));
        content.push_str("李四在远处看着。\n");
        content
    }

    pub(crate) struct Fixture {
        pub deps: WorkflowDeps,
        pub task_manager: Arc<InMemoryTaskManager>,
        pub orchestrator: Arc<WorkflowOrchestrator>,
        pub queue_receiver: mpsc::Receiver<Uuid>,
    }

    impl Fixture {
        pub(crate) async fn new(image_generator: Arc<dyn ImageGeneratorPort>) -> Self {
            let pool = test_pool().await;
            let (tx, rx) = mpsc::channel(16);
            let task_manager = InMemoryTaskManager::new(tx).arc();

            let deps = WorkflowDeps {
                task_repo: Arc::new(SqliteTaskRepository::new(pool.clone())),
                novel_repo: Arc::new(SqliteNovelRepository::new(pool.clone())),
                character_repo: Arc::new(SqliteCharacterRepository::new(pool.clone())),
                scene_repo: Arc::new(SqliteSceneRepository::new(pool.clone())),
                media_repo: Arc::new(SqliteMediaRepository::new(pool)),
                image_generator,
                task_manager: task_manager.clone(),
                heuristics: Heuristics::compile(&RuleSet::default()).unwrap(),
            };
            let orchestrator = Arc::new(WorkflowOrchestrator::new(
                deps.clone(),
                WorkflowSettings::default(),
            ));

            Self {
                deps,
                task_manager,
                orchestrator,
                queue_receiver: rx,
            }
        }

        /// 直接落库一个 pending 任务
        pub(crate) async fn seed_task(&self, content: &str) -> Task {
            let novel = Novel::new("夜行", "佚名", content).unwrap();
            let task = Task::new("alice", novel.id()).unwrap();
            self.deps.novel_repo.save(&novel).await.unwrap();
            self.deps.task_repo.save(&task).await.unwrap();
            task
        }

        pub(crate) async fn stored(&self, task_id: Uuid) -> Task {
            self.deps.task_repo.find_by_id(task_id).await.unwrap().unwrap()
        }
    }
}
