//! Task Context - Value Objects

use serde::{Deserialize, Serialize};

/// 总步骤数
pub const TOTAL_STEPS: u32 = 6;

/// 任务创建后、开始执行前的步骤名
pub const WAITING_STEP: &str = "等待中";

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// completed / failed / cancelled 为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// 生成流程的六个步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Segment,
    Extract,
    References,
    Divide,
    SceneImages,
    Done,
}

impl WorkflowStep {
    pub fn index(&self) -> u32 {
        match self {
            WorkflowStep::Segment => 1,
            WorkflowStep::Extract => 2,
            WorkflowStep::References => 3,
            WorkflowStep::Divide => 4,
            WorkflowStep::SceneImages => 5,
            WorkflowStep::Done => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::Segment => "解析章节",
            WorkflowStep::Extract => "提取角色",
            WorkflowStep::References => "生成角色参考图",
            WorkflowStep::Divide => "划分场景",
            WorkflowStep::SceneImages => "生成场景图像",
            WorkflowStep::Done => "完成",
        }
    }
}

/// 错误码
///
/// - 3xxxx: 输入小说相关
/// - 4xxxx: 生成阶段（可重试）
/// - 5xxxx: 系统内部
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const NOVEL_LOAD: ErrorCode = ErrorCode(30001);
    pub const NOVEL_PARSE: ErrorCode = ErrorCode(30002);
    pub const CHARACTER_STAGE: ErrorCode = ErrorCode(40001);
    pub const SCENE_STAGE: ErrorCode = ErrorCode(40002);
    pub const PERSISTENCE: ErrorCode = ErrorCode(50001);
    pub const INTERNAL: ErrorCode = ErrorCode(50002);
    pub const INTERRUPTED: ErrorCode = ErrorCode(50003);
    pub const QUEUE_REJECTED: ErrorCode = ErrorCode(50004);

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_retryable(&self) -> bool {
        (40000..50000).contains(&self.0)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 进度计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressDetails {
    pub characters_extracted: u32,
    pub characters_generated: u32,
    pub scenes_divided: u32,
    pub scenes_generated: u32,
}
