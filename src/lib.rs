//! # Eval Orchestrator
//!
//! 批量评测任务编排：对评测集中的每个条目调用评测服务，保存结果，
//! 并通过任务 ID 对外提供可轮询的进度。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享状态，只暴露能力
//! - `JobRegistry` - 任务记录的唯一持有者，所有修改都是原子的
//! - `ConcurrencyLimiter` - 限制同时进行中的条目数量
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个条目
//! - `ItemSource` - 枚举评测集条目
//! - `ItemExecutor` - 评测单个条目
//! - `ResultSink` - 保存评测结果
//! - `StatusQuery` - 查询任务状态
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个条目"的完整处理流程
//! - `ItemCtx` - 上下文封装（job_id + scope_id + item_index）
//! - `ItemFlow` - 流程编排（execute → persist → outcome）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/job_orchestrator` - 任务生命周期和并发配置
//! - `orchestrator/scope_runner` - 单评测集执行
//! - `orchestrator/multi_scope_runner` - 多评测集执行，共享限制器
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ConcurrencyLimiter, JobRegistry};
pub use models::{
    BatchResult, EvalItem, FinalizePolicy, JobId, JobResult, JobSpec, JobStatus,
    MultiScopeResult, ResultRecord, Scope,
};
pub use orchestrator::Orchestrator;
pub use services::{ItemExecutor, ItemSource, JobStatusView, ResultSink};
