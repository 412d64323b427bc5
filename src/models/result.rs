//! 批量执行结果
//!
//! 单评测集与多评测集的结果用带标签的枚举 [`JobResult`] 区分，
//! 调用方可以穷尽匹配结果形状。

use serde::{Deserialize, Serialize};

use crate::models::item::{ItemId, ResultId, ScopeId};
use crate::models::job::JobStatus;

/// 单个条目的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded {
        item_id: ItemId,
        result_id: ResultId,
        duration_ms: f64,
    },
    Failed {
        item_id: ItemId,
        /// 形如 `item 3: timeout`，包含条目 ID 以便定位
        error: String,
        duration_ms: f64,
    },
}

impl ItemOutcome {
    pub fn failed(item_id: ItemId, reason: impl std::fmt::Display, duration_ms: f64) -> Self {
        ItemOutcome::Failed {
            item_id,
            error: format!("item {}: {}", item_id, reason),
            duration_ms,
        }
    }

    pub fn item_id(&self) -> ItemId {
        match self {
            ItemOutcome::Succeeded { item_id, .. } | ItemOutcome::Failed { item_id, .. } => *item_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

/// 单个评测集的执行报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 按条目枚举顺序排列
    pub result_ids: Vec<ResultId>,
    pub errors: Vec<String>,
    /// 与 `result_ids` 一一对应的耗时（毫秒）
    pub durations_ms: Vec<f64>,
}

impl BatchResult {
    /// 按条目顺序汇总
    pub fn from_outcomes(outcomes: &[ItemOutcome]) -> Self {
        let mut result = BatchResult {
            total: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                ItemOutcome::Succeeded {
                    result_id,
                    duration_ms,
                    ..
                } => {
                    result.succeeded += 1;
                    result.result_ids.push(*result_id);
                    result.durations_ms.push(*duration_ms);
                }
                ItemOutcome::Failed { error, .. } => {
                    result.failed += 1;
                    result.errors.push(error.clone());
                }
            }
        }

        result
    }

    /// 枚举失败时的报告：没有任何条目被执行
    pub fn enumeration_failed(error: impl Into<String>) -> Self {
        BatchResult {
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}

/// 多评测集执行中单个评测集的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeResult {
    pub eval_set_id: ScopeId,
    pub status: JobStatus,
    #[serde(flatten)]
    pub batch: BatchResult,
}

/// 多评测集执行报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiScopeResult {
    pub sets: Vec<ScopeResult>,
    pub overall_total: usize,
    pub overall_succeeded: usize,
    pub overall_failed: usize,
}

impl MultiScopeResult {
    /// 汇总各评测集；总数恒等于各评测集之和（包括整体失败的评测集）
    pub fn from_scopes(sets: Vec<ScopeResult>) -> Self {
        let overall_total = sets.iter().map(|s| s.batch.total).sum();
        let overall_succeeded = sets.iter().map(|s| s.batch.succeeded).sum();
        let overall_failed = sets.iter().map(|s| s.batch.failed).sum();

        Self {
            sets,
            overall_total,
            overall_succeeded,
            overall_failed,
        }
    }

    /// 父任务终态：至少选择了一个评测集且全部失败时为 failed
    pub fn status(&self) -> JobStatus {
        if !self.sets.is_empty() && self.sets.iter().all(|s| s.status == JobStatus::Failed) {
            JobStatus::Failed
        } else {
            JobStatus::Success
        }
    }
}

/// 任务的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    Batch(BatchResult),
    MultiScope(MultiScopeResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(item_id: ItemId, result_id: ResultId) -> ItemOutcome {
        ItemOutcome::Succeeded {
            item_id,
            result_id,
            duration_ms: 1.5,
        }
    }

    #[test]
    fn test_from_outcomes_counts_and_orders() {
        let outcomes = vec![
            ok(1, 100),
            ItemOutcome::failed(2, "timeout", 3.0),
            ok(3, 101),
        ];
        let result = BatchResult::from_outcomes(&outcomes);

        assert_eq!(result.total, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.result_ids, vec![100, 101]);
        assert_eq!(result.durations_ms.len(), result.result_ids.len());
        assert_eq!(result.errors, vec!["item 2: timeout".to_string()]);
    }

    #[test]
    fn test_multi_scope_sums_include_failed_scopes() {
        let a = ScopeResult {
            eval_set_id: 1,
            status: JobStatus::Success,
            batch: BatchResult::from_outcomes(&[ok(1, 10), ItemOutcome::failed(2, "boom", 0.0)]),
        };
        let b = ScopeResult {
            eval_set_id: 2,
            status: JobStatus::Failed,
            batch: BatchResult::enumeration_failed("scope 2: 评测集不存在"),
        };
        let multi = MultiScopeResult::from_scopes(vec![a, b]);

        assert_eq!(multi.overall_total, 2);
        assert_eq!(multi.overall_succeeded, 1);
        assert_eq!(multi.overall_failed, 1);
        assert_eq!(multi.status(), JobStatus::Success);
    }

    #[test]
    fn test_multi_scope_status() {
        let failed = |id| ScopeResult {
            eval_set_id: id,
            status: JobStatus::Failed,
            batch: BatchResult::enumeration_failed("x"),
        };
        assert_eq!(
            MultiScopeResult::from_scopes(vec![failed(1), failed(2)]).status(),
            JobStatus::Failed
        );
        assert_eq!(MultiScopeResult::from_scopes(vec![]).status(), JobStatus::Success);
    }

    #[test]
    fn test_job_result_is_tagged() {
        let json = serde_json::to_value(JobResult::Batch(BatchResult::default())).unwrap();
        assert_eq!(json["kind"], "batch");
        assert_eq!(json["total"], 0);
    }
}
