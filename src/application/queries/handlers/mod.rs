//! Query Handlers 实现

mod content_handlers;
mod task_handlers;

pub use content_handlers::*;
pub use task_handlers::*;
