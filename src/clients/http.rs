//! 带重试的 HTTP 发送器
//!
//! 幂等请求（GET / PUT / DELETE 等）对 429 / 5xx 和连接失败按指数退避重试，
//! 其余错误立即返回。POST 只发送一次，服务端可能已经写入。

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ClientError;

/// 需要重试的状态码
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// 退避基数
const BACKOFF_BASE_MS: u64 = 300;

#[derive(Clone, Debug)]
pub struct HttpSender {
    client: Client,
    max_retries: u32,
}

impl HttpSender {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ClientError::BuildFailed)?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
        })
    }

    /// 某个请求方法允许的重试次数
    fn retry_budget(&self, method: &Method) -> u32 {
        if method.is_idempotent() {
            self.max_retries
        } else {
            0
        }
    }

    /// 发送请求并把响应体解析为 `T`
    ///
    /// # 参数
    /// - `endpoint`: 用于日志和错误信息的地址
    /// - `build`: 每次尝试都会重新构建请求
    pub async fn send_json<T, F>(&self, endpoint: &str, build: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let build_request = || {
            build(&self.client)
                .build()
                .map_err(|e| ClientError::request_failed(endpoint, e))
        };

        let first = build_request()?;
        let max_retries = self.retry_budget(first.method());
        let mut pending = Some(first);
        let mut attempt = 0;
        loop {
            let request = match pending.take() {
                Some(request) => request,
                None => build_request()?,
            };

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    if is_retryable_status(status) && attempt < max_retries {
                        warn!("⚠️ {} 返回 {}，第 {} 次重试", endpoint, status, attempt + 1);
                    } else if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ClientError::BadResponse {
                            endpoint: endpoint.to_string(),
                            status: status.as_u16(),
                            body,
                        });
                    } else {
                        debug!("{} 返回 {}", endpoint, status);
                        return response.json::<T>().await.map_err(|source| {
                            ClientError::JsonParseFailed {
                                endpoint: endpoint.to_string(),
                                source,
                            }
                        });
                    }
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < max_retries => {
                    warn!("⚠️ {} 请求失败: {}，第 {} 次重试", endpoint, e, attempt + 1);
                }
                Err(e) => return Err(ClientError::request_failed(endpoint, e)),
            }

            tokio::time::sleep(backoff(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

/// 第 `attempt` 次失败后的等待时间
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(10)))
}

/// 拼接基础地址与路径，避免重复的 `/`
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
