//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod character_handlers;
mod scene_handlers;
mod task_handlers;

pub use character_handlers::*;
pub use scene_handlers::*;
pub use task_handlers::*;
