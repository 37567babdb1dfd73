//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod image_generator;
mod repositories;
mod task_manager;

#[cfg(test)]
pub(crate) mod fault;

pub use image_generator::{
    GeneratedImage, GenerationError, ImageGeneratorPort, ImageToImageRequest, TextToImageRequest,
};
pub use repositories::{
    CharacterRepositoryPort, MediaRepositoryPort, NovelRepositoryPort, RepositoryError,
    SceneRepositoryPort, TaskPage, TaskRepositoryPort,
};
pub use task_manager::{QueueError, TaskManagerPort};
