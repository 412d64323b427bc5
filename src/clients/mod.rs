pub mod eval_api_client;
pub mod evaluator_client;
pub mod http;

pub use eval_api_client::EvalApiClient;
pub use evaluator_client::HttpItemExecutor;
