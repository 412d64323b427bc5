//! 并发限制器 - 基础设施层
//!
//! 计数型准入闸门：限制同时进行中的条目评测数量。
//! 多评测集任务中所有评测集共享同一个限制器。

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::error::ItemExecutionError;

/// 并发限制器
///
/// 基于 tokio 的 `Semaphore`（FIFO 公平），许可在 [`LimiterPermit`] 被 drop 时归还，
/// 无论条目成功、失败还是任务 panic 都不会泄漏名额。
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// 一个已获取的名额，drop 时自动归还
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// 创建限制器；`limit` 为 0 时按 1 处理，超出上限时按 `Semaphore::MAX_PERMITS` 处理
    pub fn new(limit: usize) -> Self {
        let limit = if limit == 0 {
            warn!("⚠️ 并发数为 0，按 1 处理");
            1
        } else {
            limit.min(Semaphore::MAX_PERMITS)
        };

        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// 等待直到有空闲名额
    ///
    /// 名额耗尽只会导致等待，不会失败；只有限制器被关闭时才返回错误。
    pub async fn acquire(&self) -> Result<LimiterPermit, ItemExecutionError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ItemExecutionError::LimiterClosed)?;
        Ok(LimiterPermit { _permit: permit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 当前已被占用的名额数
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }
}
