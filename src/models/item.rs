//! 评测条目与评测结果记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 评测集 ID
pub type ScopeId = i64;
/// 评测数据 ID
pub type ItemId = i64;
/// 已持久化的评测结果 ID
pub type ResultId = i64;

/// 一条评测数据（条目）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalItem {
    pub id: ItemId,
    pub eval_set_id: ScopeId,
    /// 条目在所属评测集内的序号（从 1 开始）
    #[serde(default)]
    pub corpus_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl EvalItem {
    /// 结果表中记录的条目编号：优先使用评测集内序号
    pub fn result_data_id(&self) -> i64 {
        self.corpus_id.unwrap_or(self.id)
    }
}

/// 单个条目的评测结果（尚未持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub eval_set_id: ScopeId,
    pub eval_data_id: i64,
    #[serde(default)]
    pub actual_result: Option<String>,
    #[serde(default)]
    pub actual_intent: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub agent_version: Option<String>,
    /// 是否命中知识库（0 否，1 是）
    #[serde(default)]
    pub kdb: i32,
    pub exec_time: DateTime<Utc>,
}

impl ResultRecord {
    /// 为某个条目创建空白结果，评测字段由执行器填充
    pub fn for_item(item: &EvalItem) -> Self {
        Self {
            eval_set_id: item.eval_set_id,
            eval_data_id: item.result_data_id(),
            actual_result: None,
            actual_intent: None,
            score: None,
            agent_version: None,
            kdb: 0,
            exec_time: Utc::now(),
        }
    }
}
