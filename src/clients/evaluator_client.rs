/// 评测服务客户端
///
/// 把单个条目交给外部评测服务，得到答案 / 意图 / 知识库命中 / 分数
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::http::HttpSender;
use crate::config::Config;
use crate::error::{ClientError, ItemExecutionError};
use crate::models::{EvalItem, ResultRecord};
use crate::services::ItemExecutor;

/// 发往评测服务的请求
#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    eval_data_id: i64,
    eval_set_id: i64,
    content: &'a str,
    expected: Option<&'a str>,
    intent: Option<&'a str>,
}

/// 评测服务的响应
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EvaluateResponse {
    actual_result: Option<String>,
    actual_intent: Option<String>,
    score: Option<i32>,
    kdb: i32,
    agent_version: Option<String>,
}

/// 通过 HTTP 调用评测服务的执行器
#[derive(Clone, Debug)]
pub struct HttpItemExecutor {
    evaluator_url: String,
    http: HttpSender,
}

impl HttpItemExecutor {
    /// 创建新的评测服务客户端
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        Ok(Self {
            evaluator_url: config.evaluator_url.clone(),
            http: HttpSender::new(config)?,
        })
    }
}

#[async_trait]
impl ItemExecutor for HttpItemExecutor {
    async fn execute_item(&self, item: &EvalItem) -> Result<ResultRecord, ItemExecutionError> {
        let request = EvaluateRequest {
            eval_data_id: item.id,
            eval_set_id: item.eval_set_id,
            content: &item.content,
            expected: item.expected.as_deref(),
            intent: item.intent.as_deref(),
        };

        debug!("评测条目 {} (内容长度: {})", item.id, item.content.len());

        let url = &self.evaluator_url;
        let response: EvaluateResponse = self
            .http
            .send_json(url, |client| client.post(url).json(&request))
            .await?;

        Ok(ResultRecord {
            actual_result: response.actual_result,
            actual_intent: response.actual_intent,
            score: response.score,
            kdb: response.kdb,
            agent_version: response.agent_version,
            exec_time: Utc::now(),
            ..ResultRecord::for_item(item)
        })
    }
}
