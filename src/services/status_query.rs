//! 任务状态查询 - 业务能力层
//!
//! 注册表 `get` 的只读投影，供任意数量的轮询方并发读取。

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MIN_POLL_INTERVAL_MS;
use crate::error::RegistryError;
use crate::infrastructure::JobRegistry;
use crate::models::{JobId, JobResult, JobSnapshot, JobStatus};

/// 对外暴露的任务状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub processed: usize,
    /// 0 表示总数尚未确定
    pub total: usize,
    pub errors: Vec<String>,
    /// 只有任务结束后才会返回完整结果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatusView {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 总数是否已确定
    pub fn total_known(&self) -> bool {
        self.total > 0 || self.is_terminal()
    }
}

impl From<JobSnapshot> for JobStatusView {
    fn from(job: JobSnapshot) -> Self {
        let result = if job.is_terminal() { job.result } else { None };
        Self {
            job_id: job.id,
            status: job.status,
            processed: job.processed,
            total: job.total,
            errors: job.errors,
            result,
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

/// 状态查询服务
#[derive(Clone, Debug)]
pub struct StatusQuery {
    registry: JobRegistry,
}

impl StatusQuery {
    pub fn new(registry: JobRegistry) -> Self {
        Self { registry }
    }

    /// 查询任务状态；任务不存在（或已被清理）时返回 `NotFound`
    pub async fn get_job_status(&self, job_id: JobId) -> Result<JobStatusView, RegistryError> {
        self.registry.get(job_id).await.map(JobStatusView::from)
    }

    /// 按固定间隔轮询直到任务结束
    ///
    /// 间隔不低于 1 秒。收到终止状态时返回最终状态；收到 `NotFound` 时返回错误，
    /// 调用方应当停止轮询而不是认为任务卡住。每次轮询结果都会交给 `on_progress`。
    pub async fn poll_until_terminal<F>(
        &self,
        job_id: JobId,
        interval: Duration,
        mut on_progress: F,
    ) -> Result<JobStatusView, RegistryError>
    where
        F: FnMut(&JobStatusView),
    {
        let interval = interval.max(Duration::from_millis(MIN_POLL_INTERVAL_MS));
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let view = self.get_job_status(job_id).await?;
            debug!(
                "[任务 {}] 轮询: {} {}/{}",
                job_id, view.status, view.processed, view.total
            );
            on_progress(&view);
            if view.is_terminal() {
                return Ok(view);
            }
        }
    }
}
