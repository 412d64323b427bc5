//! 条目枚举能力 - 业务能力层

use async_trait::async_trait;

use crate::error::EnumerationError;
use crate::models::{EvalItem, ScopeId};

/// 列出某个评测集内所有待执行的条目
///
/// 返回顺序即结果报告中的条目顺序。
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn enumerate_items(&self, scope: ScopeId) -> Result<Vec<EvalItem>, EnumerationError>;
}
