use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::FinalizePolicy;

/// 轮询间隔下限（毫秒）
pub const MIN_POLL_INTERVAL_MS: u64 = 1000;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 程序配置
///
/// 优先级：默认值 < TOML 配置文件 < 环境变量（`EVAL_` 前缀）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 评测后台地址（枚举评测数据、保存评测结果）
    pub backend_base_url: String,
    /// 评测服务地址（执行单个条目）
    pub evaluator_url: String,
    /// 单评测集默认并发数
    pub default_concurrency: usize,
    /// 多评测集共享的全局并发数；未设置时为 默认并发数 × 评测集数量
    pub global_concurrency: Option<usize>,
    /// 单条目超时（秒）；未设置时不限制
    pub item_timeout_secs: Option<u64>,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// HTTP 请求重试次数
    pub max_retries: u32,
    /// 状态轮询间隔（毫秒），不低于 1000
    pub poll_interval_ms: u64,
    /// 最多保留的已结束任务数量；未设置时不清理
    pub max_retained_jobs: Option<usize>,
    /// 终态判定策略
    pub finalize_policy: FinalizePolicy,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_base_url: "http://127.0.0.1:8000".to_string(),
            evaluator_url: "http://127.0.0.1:8100/v1/evaluate".to_string(),
            default_concurrency: 3,
            global_concurrency: None,
            item_timeout_secs: Some(60),
            request_timeout_secs: 30,
            max_retries: 2,
            poll_interval_ms: MIN_POLL_INTERVAL_MS,
            max_retained_jobs: Some(1000),
            finalize_policy: FinalizePolicy::default(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 只从环境变量加载（基于默认值）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 加载配置：`EVAL_CONFIG_PATH` 指定的文件（或当前目录下的 config.toml，若存在），再叠加环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("EVAL_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    /// 叠加环境变量
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_base_url: env_string("EVAL_BACKEND_BASE_URL").unwrap_or(self.backend_base_url),
            evaluator_url: env_string("EVAL_EVALUATOR_URL").unwrap_or(self.evaluator_url),
            default_concurrency: env_parse("EVAL_DEFAULT_CONCURRENCY", "usize")?.unwrap_or(self.default_concurrency),
            global_concurrency: env_parse("EVAL_GLOBAL_CONCURRENCY", "usize")?.or(self.global_concurrency),
            item_timeout_secs: env_parse("EVAL_ITEM_TIMEOUT_SECS", "u64")?.or(self.item_timeout_secs),
            request_timeout_secs: env_parse("EVAL_REQUEST_TIMEOUT_SECS", "u64")?.unwrap_or(self.request_timeout_secs),
            max_retries: env_parse("EVAL_MAX_RETRIES", "u32")?.unwrap_or(self.max_retries),
            poll_interval_ms: env_parse("EVAL_POLL_INTERVAL_MS", "u64")?.unwrap_or(self.poll_interval_ms),
            max_retained_jobs: env_parse("EVAL_MAX_RETAINED_JOBS", "usize")?.or(self.max_retained_jobs),
            finalize_policy: env_parse("EVAL_FINALIZE_POLICY", "finalize policy")?.unwrap_or(self.finalize_policy),
            verbose_logging: env_parse("EVAL_VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
        })
    }

    /// 单评测集默认并发数（至少为 1）
    pub fn scope_concurrency(&self) -> usize {
        self.default_concurrency.max(1)
    }

    /// 多评测集共享的并发数
    pub fn multi_scope_concurrency(&self, scope_count: usize) -> usize {
        self.global_concurrency
            .filter(|c| *c > 0)
            .unwrap_or_else(|| self.scope_concurrency() * scope_count.max(1))
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 实际使用的轮询间隔，不低于 1 秒
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
