//! Character Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("角色名不能为空")]
    EmptyName,

    #[error("外貌描述不能为空")]
    EmptyAppearance,

    #[error("不能与自身合并")]
    SelfMerge,

    #[error("角色不属于同一部小说")]
    NovelMismatch,
}
