pub mod item_executor;
pub mod item_source;
pub mod result_sink;
pub mod status_query;

pub use item_executor::{ItemExecutor, TimeoutExecutor};
pub use item_source::ItemSource;
pub use result_sink::ResultSink;
pub use status_query::{JobStatusView, StatusQuery};
