//! 条目处理上下文
//!
//! 封装"我正在处理哪个任务、哪个评测集的第几条"这一信息

use std::fmt::Display;

use crate::models::{JobId, ScopeId};

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 任务ID
    pub job_id: JobId,

    /// 评测集ID
    pub scope_id: ScopeId,

    /// 条目在本评测集中的位置（从1开始，仅用于日志显示）
    pub item_index: usize,

    /// 本评测集条目总数
    pub scope_total: usize,
}

impl ItemCtx {
    /// 创建新的条目上下文
    pub fn new(job_id: JobId, scope_id: ScopeId, item_index: usize, scope_total: usize) -> Self {
        Self {
            job_id,
            scope_id,
            item_index,
            scope_total,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[评测集 {} 条目 {}/{}]",
            self.scope_id, self.item_index, self.scope_total
        )
    }
}
