//! 任务编排器 - 编排层入口
//!
//! ## 职责
//!
//! 1. **组装依赖**：条目来源、条目执行器（可选超时包装）、结果写入端
//! 2. **任务生命周期**：在注册表中登记任务，选择单/多评测集执行器驱动到终态
//! 3. **并发配置**：为每个任务创建独立的限制器；多评测集任务只创建一个共享限制器
//! 4. **两种调用方式**：`submit_job` 立即返回任务 ID，`run_scope`/`run_scopes` 等待完成
//!
//! 任务提交后后台执行与调用方解耦；若后台任务意外终止，
//! 任务仍会被标记为 failed，不会一直停留在 running。

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clients::{EvalApiClient, HttpItemExecutor};
use crate::config::Config;
use crate::error::{AppResult, RegistryError};
use crate::infrastructure::{ConcurrencyLimiter, JobHandle, JobRegistry};
use crate::models::{
    BatchResult, JobId, JobMutation, JobSpec, JobStatus, MultiScopeResult, Scope, ScopeId,
};
use crate::orchestrator::multi_scope_runner::MultiScopeRunner;
use crate::orchestrator::scope_runner::ScopeRunner;
use crate::services::{
    ItemExecutor, ItemSource, JobStatusView, ResultSink, StatusQuery, TimeoutExecutor,
};
use crate::workflow::ItemFlow;

/// 任务编排器
///
/// 可以廉价地克隆，所有克隆共享同一个注册表。
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    registry: JobRegistry,
    status: StatusQuery,
    scope_runner: Arc<ScopeRunner>,
    multi_runner: Arc<MultiScopeRunner>,
}

impl Orchestrator {
    /// 用给定的依赖创建编排器
    ///
    /// 配置了 `item_timeout_secs` 时，执行器会被包装为 [`TimeoutExecutor`]。
    pub fn new(
        config: Config,
        source: Arc<dyn ItemSource>,
        executor: Arc<dyn ItemExecutor>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let executor: Arc<dyn ItemExecutor> = match config.item_timeout() {
            Some(timeout) => Arc::new(TimeoutExecutor::new(executor, timeout)),
            None => executor,
        };

        let flow = Arc::new(ItemFlow::new(executor, sink));
        let scope_runner = Arc::new(ScopeRunner::new(source, flow, config.finalize_policy));
        let multi_runner = Arc::new(MultiScopeRunner::new(scope_runner.clone()));
        let registry = JobRegistry::with_max_retained(config.max_retained_jobs);

        Self {
            status: StatusQuery::new(registry.clone()),
            config: Arc::new(config),
            registry,
            scope_runner,
            multi_runner,
        }
    }

    /// 使用 HTTP 客户端创建编排器
    pub fn from_config(config: Config) -> AppResult<Self> {
        let api = Arc::new(EvalApiClient::new(&config)?);
        let evaluator = Arc::new(HttpItemExecutor::new(&config)?);
        Ok(Self::new(config, api.clone(), evaluator, api))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn status_query(&self) -> &StatusQuery {
        &self.status
    }

    /// 提交任务，立即返回任务 ID，执行在后台进行
    pub async fn submit_job(&self, spec: JobSpec) -> JobId {
        let job_id = self.registry.create(spec.scope.clone()).await;
        info!("📥 已提交任务 {} ({})", job_id, describe_scope(&spec.scope));

        let this = self.clone();
        let handle = JobHandle::new(job_id, self.registry.clone());
        let task = tokio::spawn(async move { this.drive(&handle, spec).await });

        // 后台任务 panic 时兜底结束任务
        let registry = self.registry.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!("[任务 {}] 后台执行异常终止: {}", job_id, e);
                if let Err(e) = registry
                    .update(job_id, JobMutation::AppendError(format!("job aborted: {}", e)))
                    .await
                {
                    warn!("⚠️ [任务 {}] 记录异常失败: {}", job_id, e);
                }
                if let Err(e) = registry.finalize(job_id, JobStatus::Failed, None).await {
                    error!("[任务 {}] 无法标记为失败: {}", job_id, e);
                }
            }
        });

        job_id
    }

    /// 查询任务状态
    pub async fn get_job_status(&self, job_id: JobId) -> Result<JobStatusView, RegistryError> {
        self.status.get_job_status(job_id).await
    }

    /// 同步执行单个评测集，任务同样登记在注册表中
    pub async fn run_scope(&self, scope: ScopeId, concurrency: Option<usize>) -> BatchResult {
        let job_id = self.registry.create(Scope::Single(scope)).await;
        let handle = JobHandle::new(job_id, self.registry.clone());
        let limiter = ConcurrencyLimiter::new(self.scope_concurrency(concurrency));
        let (_, batch) = self.scope_runner.run(&handle, scope, &limiter).await;
        batch
    }

    /// 同步执行多个评测集，共享一个全局限制器
    pub async fn run_scopes(
        &self,
        scopes: Vec<ScopeId>,
        global_concurrency: Option<usize>,
    ) -> MultiScopeResult {
        let job_id = self.registry.create(Scope::Multi(scopes.clone())).await;
        let handle = JobHandle::new(job_id, self.registry.clone());
        let limiter =
            ConcurrencyLimiter::new(self.multi_scope_concurrency(global_concurrency, scopes.len()));
        let (_, result) = self.multi_runner.run(&handle, scopes, &limiter).await;
        result
    }

    async fn drive(&self, handle: &JobHandle, spec: JobSpec) -> JobStatus {
        match spec.scope {
            Scope::Single(scope) => {
                let limiter = ConcurrencyLimiter::new(self.scope_concurrency(spec.concurrency));
                self.scope_runner.run(handle, scope, &limiter).await.0
            }
            Scope::Multi(scopes) => {
                let limiter = ConcurrencyLimiter::new(
                    self.multi_scope_concurrency(spec.concurrency, scopes.len()),
                );
                self.multi_runner.run(handle, scopes, &limiter).await.0
            }
        }
    }

    fn scope_concurrency(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|c| *c > 0)
            .unwrap_or_else(|| self.config.scope_concurrency())
    }

    fn multi_scope_concurrency(&self, requested: Option<usize>, scope_count: usize) -> usize {
        requested
            .filter(|c| *c > 0)
            .unwrap_or_else(|| self.config.multi_scope_concurrency(scope_count))
    }
}

fn describe_scope(scope: &Scope) -> String {
    match scope {
        Scope::Single(id) => format!("评测集 {}", id),
        Scope::Multi(ids) => format!("{} 个评测集", ids.len()),
    }
}
