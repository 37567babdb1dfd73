//! 可注入故障的仓储包装（测试用）
//!
//! 包装真实仓储，按配置在第 N 次写入起或在读取 / 批量写入时返回数据库错误。

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{CharacterRepositoryPort, RepositoryError, SceneRepositoryPort};
use crate::domain::character::Character;
use crate::domain::scene::Scene;

fn injected() -> RepositoryError {
    RepositoryError::DatabaseError("disk I/O error".to_string())
}

/// 故障计划
#[derive(Debug, Default)]
struct Faults {
    saves: AtomicUsize,
    /// 从第几次 save 开始失败（从 1 开始）
    fail_saves_from: Option<usize>,
    fail_reads: bool,
    fail_batches: bool,
}

impl Faults {
    fn on_save(&self) -> Result<(), RepositoryError> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_saves_from {
            Some(from) if n >= from => Err(injected()),
            _ => Ok(()),
        }
    }

    fn on_read(&self) -> Result<(), RepositoryError> {
        if self.fail_reads {
            return Err(injected());
        }
        Ok(())
    }
}

pub(crate) struct FaultyCharacterRepository {
    inner: Arc<dyn CharacterRepositoryPort>,
    faults: Faults,
}

impl FaultyCharacterRepository {
    pub(crate) fn new(inner: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    pub(crate) fn fail_saves_from(mut self, n: usize) -> Self {
        self.faults.fail_saves_from = Some(n);
        self
    }

    pub(crate) fn fail_reads(mut self) -> Self {
        self.faults.fail_reads = true;
        self
    }
}

#[async_trait]
impl CharacterRepositoryPort for FaultyCharacterRepository {
    async fn save(&self, character: &Character) -> Result<(), RepositoryError> {
        self.faults.on_save()?;
        self.inner.save(character).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Character>, RepositoryError> {
        self.faults.on_read()?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Character>, RepositoryError> {
        self.faults.on_read()?;
        self.inner.find_by_novel(novel_id).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }
}

pub(crate) struct FaultySceneRepository {
    inner: Arc<dyn SceneRepositoryPort>,
    faults: Faults,
}

impl FaultySceneRepository {
    pub(crate) fn new(inner: Arc<dyn SceneRepositoryPort>) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    pub(crate) fn fail_saves_from(mut self, n: usize) -> Self {
        self.faults.fail_saves_from = Some(n);
        self
    }

    pub(crate) fn fail_batches(mut self) -> Self {
        self.faults.fail_batches = true;
        self
    }
}

#[async_trait]
impl SceneRepositoryPort for FaultySceneRepository {
    async fn save(&self, scene: &Scene) -> Result<(), RepositoryError> {
        self.faults.on_save()?;
        self.inner.save(scene).await
    }

    async fn save_batch(&self, scenes: &[Scene]) -> Result<(), RepositoryError> {
        if self.faults.fail_batches {
            return Err(injected());
        }
        self.inner.save_batch(scenes).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Scene>, RepositoryError> {
        self.faults.on_read()?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<Scene>, RepositoryError> {
        self.faults.on_read()?;
        self.inner.find_by_chapter(chapter_id).await
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Scene>, RepositoryError> {
        self.faults.on_read()?;
        self.inner.find_by_novel(novel_id).await
    }
}
