//! Task Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::WAITING_STEP;
use super::{ErrorCode, ProgressDetails, TaskError, TaskStatus, WorkflowStep};

/// Task 聚合根（生成流程的状态机）
///
/// pending → processing → completed | failed | cancelled
///
/// 不变量:
/// - 终态之后状态不再变化
/// - 进度百分比单调不减
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub(crate) id: Uuid,
    pub(crate) user_id: String,
    pub(crate) novel_id: Uuid,
    pub(crate) status: TaskStatus,
    pub(crate) step: String,
    pub(crate) step_index: u32,
    pub(crate) percentage: u8,
    pub(crate) details: ProgressDetails,
    pub(crate) error_code: Option<ErrorCode>,
    pub(crate) error_message: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) failed_at: Option<DateTime<Utc>>,
    pub(crate) cancelled_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(user_id: &str, novel_id: Uuid) -> Result<Self, TaskError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(TaskError::EmptyUser);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            novel_id,
            status: TaskStatus::Pending,
            step: WAITING_STEP.to_string(),
            step_index: 0,
            percentage: 0,
            details: ProgressDetails::default(),
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
            cancelled_at: None,
        })
    }

    /// 更新进度；首次更新时 pending → processing
    ///
    /// 百分比低于当前值时保留当前值
    pub fn update_progress(
        &mut self,
        step: WorkflowStep,
        percentage: u8,
        details: ProgressDetails,
    ) -> Result<(), TaskError> {
        self.ensure_active()?;

        self.status = TaskStatus::Processing;
        self.step = step.name().to_string();
        self.step_index = step.index();
        self.percentage = self.percentage.max(percentage.min(100));
        self.details = details;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_completed(&mut self) -> Result<(), TaskError> {
        self.ensure_active()?;

        let now = Utc::now();
        self.status = TaskStatus::Completed;
        self.step = WorkflowStep::Done.name().to_string();
        self.step_index = WorkflowStep::Done.index();
        self.percentage = 100;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_failed(&mut self, code: ErrorCode, message: impl Into<String>) -> Result<(), TaskError> {
        self.ensure_active()?;

        let now = Utc::now();
        self.status = TaskStatus::Failed;
        self.error_code = Some(code);
        self.error_message = Some(message.into());
        self.failed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// 取消（仅 pending / processing 可取消）
    pub fn cancel(&mut self) -> Result<(), TaskError> {
        self.ensure_active()?;

        let now = Utc::now();
        self.status = TaskStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(TaskError::AlreadyTerminal(self.status.as_str()));
        }
        Ok(())
    }

    /// 失败且错误码在 [40000, 50000) 区间内时可重试
    pub fn is_retryable(&self) -> bool {
        self.status == TaskStatus::Failed
            && self.error_code.map(|c| c.is_retryable()).unwrap_or(false)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn novel_id(&self) -> Uuid {
        self.novel_id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn step_index(&self) -> u32 {
        self.step_index
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    pub fn details(&self) -> ProgressDetails {
        self.details
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }
}
