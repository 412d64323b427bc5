//! 条目处理流程 - 流程层
//!
//! 核心职责：定义"一个条目"的完整处理流程
//!
//! 流程顺序：
//! 1. 调用执行器评测（计时）
//! 2. 保存评测结果
//! 3. 归类为成功 / 失败

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::error::ItemExecutionError;
use crate::models::{EvalItem, ItemOutcome};
use crate::services::{ItemExecutor, ResultSink};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 条目处理流程
///
/// - 不持有并发名额（由编排层获取）
/// - 不修改任务记录（由编排层汇报进度）
/// - 任何错误都被收敛为 [`ItemOutcome::Failed`]，不会向上传播
pub struct ItemFlow {
    executor: Arc<dyn ItemExecutor>,
    sink: Arc<dyn ResultSink>,
}

impl ItemFlow {
    /// 创建新的条目处理流程
    pub fn new(executor: Arc<dyn ItemExecutor>, sink: Arc<dyn ResultSink>) -> Self {
        Self { executor, sink }
    }

    /// 执行一个条目
    ///
    /// 耗时只统计执行器调用本身：从调用前一刻到返回（或失败）后一刻。
    pub async fn run(&self, item: &EvalItem, ctx: &ItemCtx) -> ItemOutcome {
        debug!("{} 开始评测: {}", ctx, truncate_text(&item.content, 40));

        let start = Instant::now();
        let executed = self.executor.execute_item(item).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let record = match executed {
            Ok(record) => record,
            Err(e) => return self.fail(item, ctx, e, duration_ms),
        };

        match self.sink.persist_result(record).await {
            Ok(result_id) => {
                debug!("{} ✓ 评测完成 result_id={} ({:.0}ms)", ctx, result_id, duration_ms);
                ItemOutcome::Succeeded {
                    item_id: item.id,
                    result_id,
                    duration_ms,
                }
            }
            Err(e) => self.fail(item, ctx, ItemExecutionError::from(e), duration_ms),
        }
    }

    fn fail(
        &self,
        item: &EvalItem,
        ctx: &ItemCtx,
        err: ItemExecutionError,
        duration_ms: f64,
    ) -> ItemOutcome {
        error!("{} ❌ 条目 {} 评测失败: {}", ctx, item.id, err);
        ItemOutcome::failed(item.id, err, duration_ms)
    }
}
