//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Repository、ImageGenerator、TaskManager）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - workflow: 生成流程编排
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod heuristics;
pub mod ports;
pub mod queries;
pub mod workflow;

// Re-exports
pub use commands::{
    // Task commands
    CancelTask,
    CreateTask,
    // Character commands
    ExtractCharacters,
    MergeCharacters,
    UpdateCharacter,
    // Scene commands
    DivideChapter,
    EnhanceScene,
    GeneratePrompts,
    PromptKind,
    // Handlers
    handlers::{
        CancelTaskHandler, CreateTaskHandler, DivideChapterHandler, EnhanceSceneHandler,
        ExtractCharactersHandler, GeneratePromptsHandler, MergeCharactersHandler, ScenePrompt,
        UpdateCharacterHandler,
    },
};

pub use error::ApplicationError;
pub use heuristics::Heuristics;

pub use ports::{
    // Repositories
    CharacterRepositoryPort,
    MediaRepositoryPort,
    NovelRepositoryPort,
    RepositoryError,
    SceneRepositoryPort,
    TaskPage,
    TaskRepositoryPort,
    // Image generator
    GeneratedImage,
    GenerationError,
    ImageGeneratorPort,
    ImageToImageRequest,
    TextToImageRequest,
    // Task manager
    QueueError,
    TaskManagerPort,
};

pub use queries::{
    // Task queries
    GetTaskStatus,
    ListTasks,
    // Content queries
    ListCharacters,
    ListScenes,
    // Handlers
    handlers::{
        CharacterSummary, GetTaskStatusHandler, ListCharactersHandler, ListScenesHandler,
        ListTasksHandler, Pagination, SceneSummary, TaskListView, TaskResultView, TaskStatusView,
    },
};

pub use workflow::{RunOutcome, WorkflowDeps, WorkflowOrchestrator, WorkflowSettings};
