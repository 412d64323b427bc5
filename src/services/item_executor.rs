//! 单条目评测能力 - 业务能力层
//!
//! 评测逻辑本身对编排层是黑盒：给定一个条目，返回一条结果记录或错误。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::ItemExecutionError;
use crate::models::{EvalItem, ResultRecord};

/// 执行单个条目的评测
///
/// 可能很慢（网络 / 模型调用），有副作用。
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    async fn execute_item(&self, item: &EvalItem) -> Result<ResultRecord, ItemExecutionError>;
}

/// 为任意执行器加上单条目超时
///
/// 超时表现为普通的条目失败（[`ItemExecutionError::Timeout`]）。
pub struct TimeoutExecutor {
    inner: Arc<dyn ItemExecutor>,
    timeout: Duration,
}

impl TimeoutExecutor {
    pub fn new(inner: Arc<dyn ItemExecutor>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl ItemExecutor for TimeoutExecutor {
    async fn execute_item(&self, item: &EvalItem) -> Result<ResultRecord, ItemExecutionError> {
        match tokio::time::timeout(self.timeout, self.inner.execute_item(item)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("条目 {} 评测超时 ({:?})", item.id, self.timeout);
                Err(ItemExecutionError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowExecutor(Duration);

    #[async_trait]
    impl ItemExecutor for SlowExecutor {
        async fn execute_item(&self, item: &EvalItem) -> Result<ResultRecord, ItemExecutionError> {
            tokio::time::sleep(self.0).await;
            Ok(ResultRecord::for_item(item))
        }
    }

    fn item() -> EvalItem {
        EvalItem {
            id: 1,
            eval_set_id: 1,
            corpus_id: Some(1),
            content: "问题".to_string(),
            expected: None,
            intent: None,
            deleted: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_item_failure() {
        let executor = TimeoutExecutor::new(
            Arc::new(SlowExecutor(Duration::from_secs(120))),
            Duration::from_secs(60),
        );
        let err = executor.execute_item(&item()).await.unwrap_err();
        assert!(matches!(err, ItemExecutionError::Timeout { secs: 60 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_item_passes_through() {
        let executor = TimeoutExecutor::new(
            Arc::new(SlowExecutor(Duration::from_millis(5))),
            Duration::from_secs(60),
        );
        let record = executor.execute_item(&item()).await.unwrap();
        assert_eq!(record.eval_data_id, 1);
    }
}
