//! 多评测集执行器 - 编排层
//!
//! 一个父任务覆盖多个评测集，所有条目共享同一个并发限制器。
//!
//! 分两个阶段执行：
//!
//! 1. 并发枚举所有评测集，总数一次性写入父任务（之后不再变化）。
//!    枚举失败的评测集记为 failed（total=0），错误带上评测集前缀。
//! 2. 并发执行所有评测集的条目，进度全部汇报到父任务。
//!
//! 父任务的 total 恒等于各评测集 total 之和。

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, warn};

use crate::infrastructure::{ConcurrencyLimiter, JobHandle};
use crate::models::{
    BatchResult, JobResult, JobStatus, MultiScopeResult, ScopeId, ScopeResult,
};
use crate::orchestrator::scope_runner::ScopeRunner;
use crate::utils::logging;

/// 多评测集执行器
pub struct MultiScopeRunner {
    scope_runner: Arc<ScopeRunner>,
}

impl MultiScopeRunner {
    pub fn new(scope_runner: Arc<ScopeRunner>) -> Self {
        Self { scope_runner }
    }

    /// 驱动多评测集父任务直到终止状态
    pub async fn run(
        &self,
        job: &JobHandle,
        scopes: Vec<ScopeId>,
        limiter: &ConcurrencyLimiter,
    ) -> (JobStatus, MultiScopeResult) {
        job.start().await;
        let scopes = dedup_scopes(scopes);
        logging::log_multi_scope_start(job.id(), &scopes, limiter.limit());

        // 阶段 1：并发枚举
        let listed = join_all(scopes.iter().map(|&scope| async move {
            (scope, self.scope_runner.enumerate(scope).await)
        }))
        .await;

        let total: usize = listed
            .iter()
            .map(|(_, items)| items.as_ref().map(Vec::len).unwrap_or(0))
            .sum();
        job.set_total(total).await;

        // 阶段 2：共享限制器并发执行
        let policy = self.scope_runner.policy();
        let runs = listed.into_iter().map(|(scope, items)| async move {
            match items {
                Ok(items) => {
                    let batch = self
                        .scope_runner
                        .execute_items(job, scope, items, limiter, Some(scope))
                        .await;
                    let status = policy.scope_status(batch.total, batch.failed);
                    logging::log_scope_complete(job.id(), scope, status, &batch);
                    ScopeResult {
                        eval_set_id: scope,
                        status,
                        batch,
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    error!("[任务 {}] ❌ {}", job.id(), message);
                    job.append_error(format!("scope {}: {}", scope, message))
                        .await;
                    ScopeResult {
                        eval_set_id: scope,
                        status: JobStatus::Failed,
                        batch: BatchResult::enumeration_failed(message),
                    }
                }
            }
        });
        let sets = join_all(runs).await;

        let result = MultiScopeResult::from_scopes(sets);
        let status = result.status();
        if job
            .finalize(status, JobResult::MultiScope(result.clone()))
            .await
        {
            logging::log_multi_scope_complete(job.id(), status, &result);
        }

        (status, result)
    }
}

/// 去除重复的评测集，保留首次出现的顺序
fn dedup_scopes(scopes: Vec<ScopeId>) -> Vec<ScopeId> {
    let mut seen = HashSet::with_capacity(scopes.len());
    let mut unique = Vec::with_capacity(scopes.len());
    for scope in scopes {
        if seen.insert(scope) {
            unique.push(scope);
        } else {
            warn!("⚠️ 评测集 {} 重复选择，已忽略", scope);
        }
    }
    unique
}
