/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{BatchResult, JobId, JobStatus, MultiScopeResult, ScopeId};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；未设置时 `verbose` 为 true 输出 debug 级别，否则 info。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量评测模式");
    info!("🌐 评测后台: {}", config.backend_base_url);
    info!("🤖 评测服务: {}", config.evaluator_url);
    info!("📊 默认并发数: {}", config.scope_concurrency());
    if let Some(global) = config.global_concurrency {
        info!("📊 全局并发数: {}", global);
    }
    info!("{}", "=".repeat(60));
}

/// 记录单评测集开始执行
pub fn log_scope_start(job_id: JobId, scope: ScopeId, concurrency: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 [任务 {}] 开始执行评测集 {}", job_id, scope);
    info!("📊 并发数: {}", concurrency);
    info!("{}", "=".repeat(60));
}

/// 记录多评测集开始执行
pub fn log_multi_scope_start(job_id: JobId, scopes: &[ScopeId], concurrency: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 [任务 {}] 开始执行 {} 个评测集: {:?}", job_id, scopes.len(), scopes);
    info!("📊 共享并发数: {}", concurrency);
    info!("{}", "=".repeat(60));
}

/// 记录单个评测集完成
pub fn log_scope_complete(job_id: JobId, scope: ScopeId, status: JobStatus, batch: &BatchResult) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ [任务 {}] 评测集 {} 完成 ({}): 成功 {}/{}",
        job_id, scope, status, batch.succeeded, batch.total
    );
    if batch.failed > 0 {
        info!("❌ 失败: {}", batch.failed);
    }
    info!("{}", "─".repeat(60));
}

/// 记录多评测集任务完成
pub fn log_multi_scope_complete(job_id: JobId, status: JobStatus, result: &MultiScopeResult) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ [任务 {}] {} 个评测集全部结束 ({})",
        job_id,
        result.sets.len(),
        status
    );
    info!(
        "成功 {}/{}，失败 {}",
        result.overall_succeeded, result.overall_total, result.overall_failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(succeeded: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", succeeded, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
