//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责任务生命周期和并发调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `job_orchestrator` - 任务编排器
//! - 组装来源、执行器、写入端
//! - 登记任务，后台或同步驱动任务
//! - 为每个任务创建并发限制器
//!
//! ### `scope_runner` - 单评测集执行器
//! - 枚举一个评测集的条目
//! - 受限并发地执行条目并逐条汇报进度
//! - 按终态策略结束任务
//!
//! ### `multi_scope_runner` - 多评测集执行器
//! - 先枚举所有评测集，一次性确定总数
//! - 所有评测集共享一个限制器并发执行
//! - 汇总各评测集报告
//!
//! ## 层次关系
//!
//! ```text
//! job_orchestrator (处理 JobSpec)
//!     ↓
//! multi_scope_runner (处理 Vec<ScopeId>)
//!     ↓
//! scope_runner (处理 Vec<EvalItem>)
//!     ↓
//! workflow::ItemFlow (处理单个 EvalItem)
//!     ↓
//! services (能力层：来源 / 执行 / 写入 / 查询)
//!     ↓
//! infrastructure (基础设施：JobRegistry / ConcurrencyLimiter)
//! ```

pub mod job_orchestrator;
pub mod multi_scope_runner;
pub mod scope_runner;

// 重新导出主要类型
pub use job_orchestrator::Orchestrator;
pub use multi_scope_runner::MultiScopeRunner;
pub use scope_runner::ScopeRunner;
