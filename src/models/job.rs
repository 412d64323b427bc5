//! 任务模型
//!
//! 描述一次异步批量评测任务：标识、状态、进度计数和最终结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::item::ScopeId;
use crate::models::result::JobResult;

/// 任务标识（对外使用的 UUID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// 生成新的随机任务标识
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// 是否为终止状态（success / failed）
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 任务的目标范围：单个评测集，或同时执行多个评测集
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Scope {
    Single(ScopeId),
    Multi(Vec<ScopeId>),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Single(id) => write!(f, "评测集 {}", id),
            Scope::Multi(ids) => write!(f, "{} 个评测集 {:?}", ids.len(), ids),
        }
    }
}

/// 提交任务时的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub scope: Scope,
    /// 并发上限；多评测集时为全局共享上限
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

impl JobSpec {
    pub fn single(scope: ScopeId) -> Self {
        Self {
            scope: Scope::Single(scope),
            concurrency: None,
        }
    }

    pub fn multi(scopes: Vec<ScopeId>) -> Self {
        Self {
            scope: Scope::Multi(scopes),
            concurrency: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }
}

/// 任务在某一时刻的完整快照
///
/// 注册表内部以此结构保存记录，`get` 返回它的副本，
/// 调用方永远拿不到注册表内记录的可变引用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub scope: Scope,
    pub status: JobStatus,
    /// 0 表示尚未完成枚举
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 按完成顺序追加的失败描述
    pub errors: Vec<String>,
    /// 仅在终止状态下存在
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    pub(crate) fn new(id: JobId, scope: Scope) -> Self {
        Self {
            id,
            scope,
            status: JobStatus::Pending,
            total: 0,
            processed: 0,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
            result: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 对单个任务记录的原子修改
///
/// 每个变体在注册表写锁内整体生效，读者不会看到只改了一半的记录
/// （例如 `processed` 已加一但对应的错误尚未追加）。
#[derive(Debug, Clone, PartialEq)]
pub enum JobMutation {
    /// pending -> running
    Start,
    /// 设置条目总数；一旦为非零值便不再改变
    SetTotal(usize),
    /// 一个条目成功完成
    ItemSucceeded,
    /// 一个条目失败，并附带错误描述
    ItemFailed(String),
    /// 追加与具体条目无关的错误（如枚举失败）
    AppendError(String),
}

/// 终态判定策略
///
/// 只有"范围内的条目全部失败"这一种情况在两种策略下结论不同。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizePolicy {
    /// 至少执行了一个条目且全部失败时判定为 failed
    #[default]
    AllFailedIsFailure,
    /// 只有枚举失败才判定为 failed
    EnumerationOnly,
}

impl FinalizePolicy {
    /// 根据一个已经执行完毕的范围计算其终态
    pub fn scope_status(self, total: usize, failed: usize) -> JobStatus {
        match self {
            FinalizePolicy::AllFailedIsFailure if total > 0 && failed == total => JobStatus::Failed,
            _ => JobStatus::Success,
        }
    }
}

impl FromStr for FinalizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_failed_is_failure" => Ok(FinalizePolicy::AllFailedIsFailure),
            "enumeration_only" => Ok(FinalizePolicy::EnumerationOnly),
            other => Err(format!("未知的终态策略: {}", other)),
        }
    }
}
