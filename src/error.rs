use thiserror::Error;

use crate::models::{JobId, ScopeId};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// HTTP 客户端错误
    #[error("客户端错误: {0}")]
    Client(#[from] ClientError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 无法确定某个评测集的条目列表
///
/// 对该评测集是致命的：评测集直接以 failed 结束。
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// 评测集不存在
    #[error("评测集 {scope} 不存在")]
    ScopeNotFound { scope: ScopeId },
    /// 请求失败
    #[error("获取评测集 {scope} 的数据失败: {source}")]
    RequestFailed {
        scope: ScopeId,
        #[source]
        source: ClientError,
    },
    /// 其他来源的枚举失败
    #[error("获取评测集 {scope} 的数据失败: {message}")]
    Other { scope: ScopeId, message: String },
}

/// 单个条目评测失败
///
/// 只会被记录和汇总，从不向上传播，也不会中止同批次的其他条目。
#[derive(Debug, Error)]
pub enum ItemExecutionError {
    /// 超过单条目超时时间
    #[error("item eval timed out after {secs}s")]
    Timeout { secs: u64 },
    /// 调用评测服务失败
    #[error("评测请求失败: {0}")]
    Request(#[from] ClientError),
    /// 结果持久化失败
    #[error("结果保存失败: {0}")]
    Persist(#[from] PersistError),
    /// 并发限制器已关闭
    #[error("并发限制器已关闭")]
    LimiterClosed,
    /// 执行任务异常终止（panic 或被取消）
    #[error("执行任务异常终止: {0}")]
    Aborted(String),
    /// 执行器报告的失败原因
    #[error("{0}")]
    Failed(String),
}

/// 结果持久化失败
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("保存评测结果失败: {0}")]
    RequestFailed(#[from] ClientError),
    #[error("{0}")]
    Other(String),
}

/// 任务注册表错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// 任务不存在（或已被清理）；轮询方应停止轮询
    #[error("任务 {0} 不存在")]
    NotFound(JobId),
    /// 任务仍在运行，不允许清理
    #[error("任务 {0} 仍在运行，不能清理")]
    JobStillRunning(JobId),
    /// 非终止状态不能用于结束任务
    #[error("任务 {job_id} 不能以非终止状态 {status} 结束")]
    InvalidFinalStatus { job_id: JobId, status: String },
}

/// HTTP 客户端错误
#[derive(Debug, Error)]
pub enum ClientError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回错误状态码
    #[error("返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 响应 JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 构建 HTTP 客户端失败
    #[error("创建 HTTP 客户端失败: {0}")]
    BuildFailed(#[source] reqwest::Error),
}

impl ClientError {
    /// 是否是找不到资源（404）
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::BadResponse { status: 404, .. })
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl ClientError {
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        ClientError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_matches_backend_wording() {
        let err = ItemExecutionError::Timeout { secs: 60 };
        assert_eq!(err.to_string(), "item eval timed out after 60s");
    }

    #[test]
    fn test_failed_message_is_passed_through() {
        let err = ItemExecutionError::Failed("timeout".to_string());
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn test_enumeration_errors_name_the_scope() {
        let err = EnumerationError::Other {
            scope: 4,
            message: "数据格式错误".to_string(),
        };
        assert!(err.to_string().contains('4'));
        assert_eq!(EnumerationError::ScopeNotFound { scope: 9 }.to_string(), "评测集 9 不存在");
    }

    #[test]
    fn test_not_found_detection() {
        let err = ClientError::BadResponse {
            endpoint: "/api/v1/evalsets/9/data".to_string(),
            status: 404,
            body: String::new(),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn test_config_error_converts_into_app_error() {
        let err: AppError = ConfigError::EnvVarParseFailed {
            var_name: "EVAL_MAX_RETRIES".to_string(),
            value: "many".to_string(),
            expected_type: "u32".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Config(ConfigError::EnvVarParseFailed { .. })));
    }
}
