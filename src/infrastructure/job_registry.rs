//! 任务注册表 - 基础设施层
//!
//! 内存中的任务表，按任务 ID 索引。
//!
//! - 所有修改都在写锁内整体生效（[`JobMutation`]），读者只会看到完整的记录
//! - `get` 返回快照副本，任何调用方都拿不到表内记录的可变引用
//! - `finalize` 只生效一次，重复调用是无副作用的空操作
//! - 保留策略只清理已结束的任务，运行中的任务永远不会被丢弃

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::models::{JobId, JobMutation, JobResult, JobSnapshot, JobStatus, Scope};

/// 任务注册表
#[derive(Clone, Debug, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobSnapshot>>>,
    max_retained: Option<usize>,
}

impl JobRegistry {
    /// 创建不做数量限制的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建最多保留 `max_retained` 个已结束任务的注册表
    pub fn with_max_retained(max_retained: Option<usize>) -> Self {
        Self {
            jobs: Arc::default(),
            max_retained,
        }
    }

    /// 登记新任务：status=pending, processed=0, total=0
    pub async fn create(&self, scope: Scope) -> JobId {
        let mut jobs = self.jobs.write().await;

        let mut id = JobId::new_random();
        while jobs.contains_key(&id) {
            id = JobId::new_random();
        }

        jobs.insert(id, JobSnapshot::new(id, scope));
        debug!("登记任务 {}", id);

        if let Some(cap) = self.max_retained {
            enforce_retention(&mut jobs, cap);
        }

        id
    }

    /// 获取任务快照
    pub async fn get(&self, job_id: JobId) -> Result<JobSnapshot, RegistryError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(RegistryError::NotFound(job_id))
    }

    /// 原子地应用一次修改；已结束的任务不再接受修改
    pub async fn update(&self, job_id: JobId, mutation: JobMutation) -> Result<(), RegistryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(RegistryError::NotFound(job_id))?;

        if job.is_terminal() {
            debug!("任务 {} 已结束，忽略修改 {:?}", job_id, mutation);
            return Ok(());
        }

        apply_mutation(job, mutation);
        Ok(())
    }

    /// 将任务转为终止状态
    ///
    /// 返回 `true` 表示本次调用完成了状态转换；任务已是终止状态时返回 `false` 且不做任何修改。
    pub async fn finalize(
        &self,
        job_id: JobId,
        status: JobStatus,
        result: Option<JobResult>,
    ) -> Result<bool, RegistryError> {
        if !status.is_terminal() {
            return Err(RegistryError::InvalidFinalStatus {
                job_id,
                status: status.to_string(),
            });
        }

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(RegistryError::NotFound(job_id))?;

        if job.is_terminal() {
            debug!("任务 {} 已经是 {} 状态，忽略重复的结束请求", job_id, job.status);
            return Ok(false);
        }

        job.status = status;
        job.result = result;
        job.finished_at = Some(Utc::now());
        if job.started_at.is_none() {
            job.started_at = job.finished_at;
        }
        Ok(true)
    }

    /// 清理单个已结束的任务
    pub async fn evict(&self, job_id: JobId) -> Result<JobSnapshot, RegistryError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get(&job_id).map(JobSnapshot::is_terminal) {
            None => Err(RegistryError::NotFound(job_id)),
            Some(false) => Err(RegistryError::JobStillRunning(job_id)),
            Some(true) => jobs.remove(&job_id).ok_or(RegistryError::NotFound(job_id)),
        }
    }

    /// 清理在 `cutoff` 之前结束的所有任务，返回清理数量
    pub async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !matches!(job.finished_at, Some(t) if job.is_terminal() && t < cutoff));
        let evicted = before - jobs.len();
        if evicted > 0 {
            info!("🧹 已清理 {} 个过期任务", evicted);
        }
        evicted
    }

    /// 当前保存的任务数量
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

fn apply_mutation(job: &mut JobSnapshot, mutation: JobMutation) {
    match mutation {
        JobMutation::Start => {
            if job.status == JobStatus::Pending {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
            }
        }
        JobMutation::SetTotal(total) => {
            if job.total == 0 {
                job.total = total;
            } else if job.total != total {
                warn!(
                    "⚠️ 任务 {} 的总数已确定为 {}，忽略新的总数 {}",
                    job.id, job.total, total
                );
            }
        }
        JobMutation::ItemSucceeded => {
            if count_item(job) {
                job.succeeded += 1;
            }
        }
        JobMutation::ItemFailed(error) => {
            if count_item(job) {
                job.failed += 1;
                job.errors.push(error);
            }
        }
        JobMutation::AppendError(error) => job.errors.push(error),
    }
}

/// processed 加一；若会超过已确定的总数则拒绝
fn count_item(job: &mut JobSnapshot) -> bool {
    if job.total > 0 && job.processed >= job.total {
        warn!(
            "⚠️ 任务 {} 已处理 {}/{}，忽略多余的条目结果",
            job.id, job.processed, job.total
        );
        return false;
    }
    job.processed += 1;
    true
}

/// 超出上限时按结束时间从早到晚清理已结束的任务
fn enforce_retention(jobs: &mut HashMap<JobId, JobSnapshot>, cap: usize) {
    let mut finished: Vec<(DateTime<Utc>, JobId)> = jobs
        .values()
        .filter(|job| job.is_terminal())
        .map(|job| (job.finished_at.unwrap_or(job.created_at), job.id))
        .collect();

    if finished.len() <= cap {
        return;
    }

    finished.sort_by_key(|(finished_at, _)| *finished_at);
    let excess = finished.len() - cap;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
    debug!("保留上限 {}，清理了 {} 个已结束任务", cap, excess);
}

/// 单个任务的写入句柄
///
/// 由执行该任务的批量执行器独占使用；读者通过 [`JobRegistry::get`] 获取快照。
#[derive(Clone, Debug)]
pub struct JobHandle {
    id: JobId,
    registry: JobRegistry,
}

impl JobHandle {
    pub fn new(id: JobId, registry: JobRegistry) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub async fn start(&self) {
        self.apply(JobMutation::Start).await;
    }

    pub async fn set_total(&self, total: usize) {
        self.apply(JobMutation::SetTotal(total)).await;
    }

    pub async fn record_success(&self) {
        self.apply(JobMutation::ItemSucceeded).await;
    }

    pub async fn record_failure(&self, error: impl Into<String>) {
        self.apply(JobMutation::ItemFailed(error.into())).await;
    }

    pub async fn append_error(&self, error: impl Into<String>) {
        self.apply(JobMutation::AppendError(error.into())).await;
    }

    /// 结束任务；返回是否由本次调用完成转换
    pub async fn finalize(&self, status: JobStatus, result: JobResult) -> bool {
        match self.registry.finalize(self.id, status, Some(result)).await {
            Ok(transitioned) => transitioned,
            Err(e) => {
                warn!("⚠️ [任务 {}] 结束任务失败: {}", self.id, e);
                false
            }
        }
    }

    /// 写入期间任务被外部清理时只记录警告
    async fn apply(&self, mutation: JobMutation) {
        if let Err(e) = self.registry.update(self.id, mutation).await {
            warn!("⚠️ [任务 {}] 更新进度失败: {}", self.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchResult;

    fn batch() -> JobResult {
        JobResult::Batch(BatchResult::default())
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        let job = registry.get(id).await.unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total, 0);
        assert_eq!(job.processed, 0);
        assert!(job.errors.is_empty());
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        let id = JobId::new_random();
        assert_eq!(registry.get(id).await, Err(RegistryError::NotFound(id)));
        assert_eq!(
            registry.update(id, JobMutation::Start).await,
            Err(RegistryError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn test_failure_updates_counters_and_errors_together() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        registry.update(id, JobMutation::Start).await.unwrap();
        registry.update(id, JobMutation::SetTotal(2)).await.unwrap();
        registry
            .update(id, JobMutation::ItemFailed("item 9: boom".into()))
            .await
            .unwrap();

        let job = registry.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.processed, 1);
        assert_eq!(job.failed, 1);
        assert_eq!(job.errors, vec!["item 9: boom".to_string()]);
    }

    #[tokio::test]
    async fn test_total_is_fixed_once_non_zero() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        registry.update(id, JobMutation::SetTotal(5)).await.unwrap();
        registry.update(id, JobMutation::SetTotal(7)).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().total, 5);
    }

    #[tokio::test]
    async fn test_processed_never_exceeds_total() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        registry.update(id, JobMutation::SetTotal(1)).await.unwrap();
        registry.update(id, JobMutation::ItemSucceeded).await.unwrap();
        registry.update(id, JobMutation::ItemSucceeded).await.unwrap();

        let job = registry.get(id).await.unwrap();
        assert_eq!(job.processed, 1);
        assert_eq!(job.succeeded, 1);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;

        assert!(registry.finalize(id, JobStatus::Success, Some(batch())).await.unwrap());
        let first = registry.get(id).await.unwrap();

        assert!(!registry.finalize(id, JobStatus::Failed, None).await.unwrap());
        let second = registry.get(id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.status, JobStatus::Success);
    }

    #[tokio::test]
    async fn test_finalize_rejects_non_terminal_status() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        let err = registry.finalize(id, JobStatus::Running, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFinalStatus { .. }));
    }

    #[tokio::test]
    async fn test_terminal_job_ignores_mutations() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        registry.finalize(id, JobStatus::Success, Some(batch())).await.unwrap();
        registry.update(id, JobMutation::ItemSucceeded).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().processed, 0);
    }

    #[tokio::test]
    async fn test_evict_refuses_running_job() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        registry.update(id, JobMutation::Start).await.unwrap();

        assert_eq!(registry.evict(id).await, Err(RegistryError::JobStillRunning(id)));

        registry.finalize(id, JobStatus::Success, Some(batch())).await.unwrap();
        assert!(registry.evict(id).await.is_ok());
        assert_eq!(registry.get(id).await, Err(RegistryError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_retention_cap_only_drops_finished_jobs() {
        let registry = JobRegistry::with_max_retained(Some(1));

        let running = registry.create(Scope::Single(1)).await;
        registry.update(running, JobMutation::Start).await.unwrap();

        let old = registry.create(Scope::Single(2)).await;
        registry.finalize(old, JobStatus::Success, Some(batch())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = registry.create(Scope::Single(3)).await;
        registry.finalize(newer, JobStatus::Success, Some(batch())).await.unwrap();

        // 触发一次清理
        let _ = registry.create(Scope::Single(4)).await;

        assert!(registry.get(running).await.is_ok());
        assert_eq!(registry.get(old).await, Err(RegistryError::NotFound(old)));
        assert!(registry.get(newer).await.is_ok());
    }

    #[tokio::test]
    async fn test_evict_finished_before() {
        let registry = JobRegistry::new();
        let done = registry.create(Scope::Single(1)).await;
        registry.finalize(done, JobStatus::Failed, Some(batch())).await.unwrap();
        let pending = registry.create(Scope::Single(2)).await;

        let evicted = registry
            .evict_finished_before(Utc::now() + chrono::Duration::seconds(1))
            .await;

        assert_eq!(evicted, 1);
        assert!(registry.get(pending).await.is_ok());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_readers_never_see_torn_failures() {
        let registry = JobRegistry::new();
        let id = registry.create(Scope::Single(1)).await;
        registry.update(id, JobMutation::SetTotal(200)).await.unwrap();

        let writer = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    registry
                        .update(id, JobMutation::ItemFailed(format!("item {}: x", i)))
                        .await
                        .unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let job = registry.get(id).await.unwrap();
                    assert_eq!(job.processed, job.errors.len());
                    assert_eq!(job.failed, job.errors.len());
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
