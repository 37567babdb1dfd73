//! Scene Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("场景描述不能为空")]
    EmptyDescription,

    #[error("场景序号从 1 开始")]
    InvalidNumber,
}
