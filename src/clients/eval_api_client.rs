/// 评测后台 API 客户端
///
/// 封装评测数据枚举与评测结果保存两类调用
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::clients::http::{join_url, HttpSender};
use crate::config::Config;
use crate::error::{ClientError, EnumerationError, PersistError};
use crate::models::{EvalItem, ResultId, ResultRecord, ScopeId};
use crate::services::{ItemSource, ResultSink};

/// 保存结果后后台返回的记录（只关心 id）
#[derive(Debug, Deserialize)]
struct PersistedResult {
    id: ResultId,
}

/// 评测后台客户端
#[derive(Clone, Debug)]
pub struct EvalApiClient {
    base_url: String,
    http: HttpSender,
}

impl EvalApiClient {
    /// 创建新的后台客户端
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: config.backend_base_url.clone(),
            http: HttpSender::new(config)?,
        })
    }

    /// 获取评测集下的评测数据
    ///
    /// # 参数
    /// - `scope`: 评测集ID
    ///
    /// # 返回
    /// 返回未删除的评测数据，保持后台返回的顺序
    pub async fn list_eval_data(&self, scope: ScopeId) -> Result<Vec<EvalItem>, ClientError> {
        let url = join_url(&self.base_url, &format!("api/v1/evalsets/{}/data", scope));
        let items: Vec<EvalItem> = self.http.send_json(&url, |client| client.get(&url)).await?;

        let items: Vec<EvalItem> = items.into_iter().filter(|item| !item.deleted).collect();
        debug!("评测集 {} 共 {} 条评测数据", scope, items.len());
        Ok(items)
    }

    /// 保存评测结果
    ///
    /// # 参数
    /// - `record`: 评测结果
    ///
    /// # 返回
    /// 返回新结果的ID
    pub async fn create_result(&self, record: &ResultRecord) -> Result<ResultId, ClientError> {
        let url = join_url(&self.base_url, "api/v1/evalresults/");
        let saved: PersistedResult = self
            .http
            .send_json(&url, |client| client.post(&url).json(record))
            .await?;

        debug!(
            "保存评测结果: id={} set={} data={} score={:?}",
            saved.id, record.eval_set_id, record.eval_data_id, record.score
        );
        Ok(saved.id)
    }
}

#[async_trait]
impl ItemSource for EvalApiClient {
    async fn enumerate_items(&self, scope: ScopeId) -> Result<Vec<EvalItem>, EnumerationError> {
        info!("📁 正在获取评测集 {} 的评测数据...", scope);
        self.list_eval_data(scope).await.map_err(|e| {
            if e.is_not_found() {
                EnumerationError::ScopeNotFound { scope }
            } else {
                EnumerationError::RequestFailed { scope, source: e }
            }
        })
    }
}

#[async_trait]
impl ResultSink for EvalApiClient {
    async fn persist_result(&self, record: ResultRecord) -> Result<ResultId, PersistError> {
        Ok(self.create_result(&record).await?)
    }
}
