//! 结果持久化能力 - 业务能力层

use async_trait::async_trait;

use crate::error::PersistError;
use crate::models::{ResultId, ResultRecord};

/// 保存一条评测结果，返回其 ID
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist_result(&self, record: ResultRecord) -> Result<ResultId, PersistError>;
}
