#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eval_orchestrator::error::{EnumerationError, ItemExecutionError, PersistError};
use eval_orchestrator::models::{ItemId, ResultId, ScopeId};
use eval_orchestrator::{
    Config, EvalItem, ItemExecutor, ItemSource, JobId, JobStatusView, Orchestrator,
    ResultRecord, ResultSink,
};

pub fn item(id: ItemId, scope: ScopeId) -> EvalItem {
    EvalItem {
        id,
        eval_set_id: scope,
        corpus_id: None,
        content: format!("问题 {}", id),
        expected: Some(format!("答案 {}", id)),
        intent: None,
        deleted: false,
    }
}

pub fn items(scope: ScopeId, ids: impl IntoIterator<Item = ItemId>) -> Vec<EvalItem> {
    ids.into_iter().map(|id| item(id, scope)).collect()
}

/// 内存条目来源；未登记的评测集返回 `ScopeNotFound`
#[derive(Default)]
pub struct FakeSource {
    scopes: HashMap<ScopeId, Vec<EvalItem>>,
    panicking: HashSet<ScopeId>,
}

impl FakeSource {
    pub fn with_scope(mut self, scope: ScopeId, items: Vec<EvalItem>) -> Self {
        self.scopes.insert(scope, items);
        self
    }

    /// 枚举该评测集时 panic
    pub fn with_panicking_scope(mut self, scope: ScopeId) -> Self {
        self.panicking.insert(scope);
        self
    }
}

#[async_trait]
impl ItemSource for FakeSource {
    async fn enumerate_items(&self, scope: ScopeId) -> Result<Vec<EvalItem>, EnumerationError> {
        if self.panicking.contains(&scope) {
            panic!("listing scope {} crashed", scope);
        }
        self.scopes
            .get(&scope)
            .cloned()
            .ok_or(EnumerationError::ScopeNotFound { scope })
    }
}

/// 记录并发峰值的执行器；`failing` 中的条目返回 "timeout"
pub struct FakeExecutor {
    failing: HashSet<ItemId>,
    panicking: HashSet<ItemId>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            failing: HashSet::new(),
            panicking: HashSet::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.failing.extend(ids);
        self
    }

    /// 执行这些条目时 panic
    pub fn panicking(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.panicking.extend(ids);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemExecutor for FakeExecutor {
    async fn execute_item(&self, item: &EvalItem) -> Result<ResultRecord, ItemExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(&item.id) {
            panic!("boom");
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&item.id) {
            return Err(ItemExecutionError::Failed("timeout".to_string()));
        }

        let mut record = ResultRecord::for_item(item);
        record.actual_result = item.expected.clone();
        record.score = Some(1);
        Ok(record)
    }
}

/// 分配递增 ID 的结果写入端；`rejecting` 中的条目写入失败
pub struct FakeSink {
    next_id: AtomicI64,
    rejecting: HashSet<i64>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            rejecting: HashSet::new(),
        }
    }

    pub fn rejecting(mut self, eval_data_ids: impl IntoIterator<Item = i64>) -> Self {
        self.rejecting.extend(eval_data_ids);
        self
    }
}

#[async_trait]
impl ResultSink for FakeSink {
    async fn persist_result(&self, record: ResultRecord) -> Result<ResultId, PersistError> {
        if self.rejecting.contains(&record.eval_data_id) {
            return Err(PersistError::Other("database is locked".to_string()));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn test_config(default_concurrency: usize) -> Config {
    Config {
        default_concurrency,
        item_timeout_secs: None,
        ..Config::default()
    }
}

pub fn orchestrator(
    config: Config,
    source: FakeSource,
    executor: Arc<FakeExecutor>,
    sink: FakeSink,
) -> Orchestrator {
    let source = Arc::new(source);
    let sink = Arc::new(sink);
    Orchestrator::new(config, source, executor, sink)
}

/// 快速轮询直到任务结束
pub async fn wait_terminal(orchestrator: &Orchestrator, job_id: JobId) -> JobStatusView {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let view = orchestrator
                .get_job_status(job_id)
                .await
                .expect("job should exist");
            if view.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job should finish")
}
