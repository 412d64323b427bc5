//! 基础设施层（Infrastructure Layer）
//!
//! 持有共享的稀缺资源，只暴露能力：
//! - `ConcurrencyLimiter` - 同时进行中的条目评测名额
//! - `JobRegistry` - 任务表，提供原子的读取 / 修改 / 结束操作

pub mod job_registry;
pub mod limiter;

pub use job_registry::{JobHandle, JobRegistry};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
