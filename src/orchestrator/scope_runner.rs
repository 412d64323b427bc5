//! 单评测集执行器 - 编排层
//!
//! ## 职责
//!
//! 驱动一个单评测集任务：pending -> running -> {success, failed}
//!
//! 1. **枚举条目**：获取评测集的全部条目，数量一确定就写入 `total`；
//!    枚举失败则立即以 failed 结束（total=0，只有一条错误）
//! 2. **并发分发**：每个条目先获取限制器名额，再交给 `ItemFlow` 执行
//! 3. **增量汇报**：每个条目完成时原子地更新任务记录
//! 4. **结束任务**：按 [`FinalizePolicy`] 计算终态并写入结果
//!
//! 单个条目失败不会中止其他条目：100 条中 3 条失败，其余 97 条照常执行并汇报。

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{EnumerationError, ItemExecutionError};
use crate::infrastructure::{ConcurrencyLimiter, JobHandle};
use crate::models::{
    BatchResult, EvalItem, FinalizePolicy, ItemOutcome, JobResult, JobStatus, ScopeId,
};
use crate::services::ItemSource;
use crate::utils::logging;
use crate::workflow::{ItemCtx, ItemFlow};

/// 单评测集执行器
pub struct ScopeRunner {
    source: Arc<dyn ItemSource>,
    flow: Arc<ItemFlow>,
    policy: FinalizePolicy,
}

/// 一个条目的执行槽位
enum Slot {
    /// 未能启动，已直接得到结果
    Done(ItemOutcome),
    /// 已派发到后台任务
    Spawned(i64, JoinHandle<ItemOutcome>),
}

impl ScopeRunner {
    pub fn new(source: Arc<dyn ItemSource>, flow: Arc<ItemFlow>, policy: FinalizePolicy) -> Self {
        Self {
            source,
            flow,
            policy,
        }
    }

    pub fn policy(&self) -> FinalizePolicy {
        self.policy
    }

    /// 驱动单评测集任务直到终止状态，返回终态和报告
    pub async fn run(
        &self,
        job: &JobHandle,
        scope: ScopeId,
        limiter: &ConcurrencyLimiter,
    ) -> (JobStatus, BatchResult) {
        job.start().await;
        logging::log_scope_start(job.id(), scope, limiter.limit());

        let items = match self.enumerate(scope).await {
            Ok(items) => items,
            Err(e) => {
                let message = e.to_string();
                error!("[任务 {}] ❌ {}", job.id(), message);
                job.append_error(message.clone()).await;

                let batch = BatchResult::enumeration_failed(message);
                job.finalize(JobStatus::Failed, JobResult::Batch(batch.clone()))
                    .await;
                return (JobStatus::Failed, batch);
            }
        };

        job.set_total(items.len()).await;

        let batch = self.execute_items(job, scope, items, limiter, None).await;
        let status = self.policy.scope_status(batch.total, batch.failed);

        if job.finalize(status, JobResult::Batch(batch.clone())).await {
            logging::log_scope_complete(job.id(), scope, status, &batch);
        }

        (status, batch)
    }

    /// 枚举评测集内的条目
    pub async fn enumerate(&self, scope: ScopeId) -> Result<Vec<EvalItem>, EnumerationError> {
        let items = self.source.enumerate_items(scope).await?;
        info!("✓ 评测集 {} 共有 {} 个待执行条目", scope, items.len());
        Ok(items)
    }

    /// 并发执行一批条目并按条目顺序汇总
    ///
    /// # 参数
    /// - `job`: 接收进度的任务
    /// - `scope`: 条目所属的评测集
    /// - `items`: 条目列表
    /// - `limiter`: 并发限制器（多评测集时为共享实例）
    /// - `error_scope`: 若设置，写入任务记录的错误会带上评测集前缀
    pub async fn execute_items(
        &self,
        job: &JobHandle,
        scope: ScopeId,
        items: Vec<EvalItem>,
        limiter: &ConcurrencyLimiter,
        error_scope: Option<ScopeId>,
    ) -> BatchResult {
        let total = items.len();
        let mut slots = Vec::with_capacity(total);

        // 为每个条目创建并发任务
        for (idx, item) in items.into_iter().enumerate() {
            let ctx = ItemCtx::new(job.id(), scope, idx + 1, total);
            let item_id = item.id;

            let permit = match limiter.acquire().await {
                Ok(permit) => permit,
                // 本模块从不关闭限制器；若被外部关闭，条目记为失败而不是中止整批
                Err(e) => {
                    let outcome = ItemOutcome::failed(item_id, e, 0.0);
                    report(job, &outcome, error_scope).await;
                    slots.push(Slot::Done(outcome));
                    continue;
                }
            };

            let flow = self.flow.clone();
            let job = job.clone();
            let handle = tokio::spawn(async move {
                let outcome = {
                    let _permit = permit;
                    flow.run(&item, &ctx).await
                };
                report(&job, &outcome, error_scope).await;
                outcome
            });
            slots.push(Slot::Spawned(item_id, handle));
        }

        // 等待所有条目完成
        let mut outcomes = Vec::with_capacity(total);
        for slot in slots {
            let outcome = match slot {
                Slot::Done(outcome) => outcome,
                Slot::Spawned(item_id, handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("[评测集 {}] 条目 {} 任务执行失败: {}", scope, item_id, e);
                        let outcome = ItemOutcome::failed(
                            item_id,
                            ItemExecutionError::Aborted(e.to_string()),
                            0.0,
                        );
                        report(job, &outcome, error_scope).await;
                        outcome
                    }
                },
            };
            outcomes.push(outcome);
        }

        BatchResult::from_outcomes(&outcomes)
    }
}

/// 把一个条目的结果写入任务记录
async fn report(job: &JobHandle, outcome: &ItemOutcome, error_scope: Option<ScopeId>) {
    match outcome {
        ItemOutcome::Succeeded { .. } => job.record_success().await,
        ItemOutcome::Failed { error, .. } => {
            let message = match error_scope {
                Some(scope) => format!("scope {}: {}", scope, error),
                None => error.clone(),
            };
            job.record_failure(message).await;
        }
    }
}
