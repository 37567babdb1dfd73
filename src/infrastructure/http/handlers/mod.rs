//! HTTP Handlers

mod character;
mod ping;
mod scene;
mod task;

pub use character::*;
pub use ping::*;
pub use scene::*;
pub use task::*;
