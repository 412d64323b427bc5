pub mod item;
pub mod job;
pub mod result;

pub use item::{EvalItem, ItemId, ResultId, ResultRecord, ScopeId};
pub use job::{FinalizePolicy, JobId, JobMutation, JobSnapshot, JobSpec, JobStatus, Scope};
pub use result::{BatchResult, ItemOutcome, JobResult, MultiScopeResult, ScopeResult};
