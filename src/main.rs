use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use eval_orchestrator::models::ScopeId;
use eval_orchestrator::utils::logging;
use eval_orchestrator::{AppResult, Config, JobSpec, Orchestrator};

#[derive(Parser)]
#[command(name = "eval-orchestrator", about = "批量评测任务编排")]
struct Cli {
    /// 配置文件路径（默认读取 EVAL_CONFIG_PATH 或 ./config.toml）
    #[arg(long, global = true)]
    config: Option<String>,
    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 执行单个评测集并等待完成
    RunSet {
        eval_set_id: ScopeId,
        /// 并发数，默认使用配置中的 default_concurrency
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// 执行多个评测集并等待完成，所有评测集共享一个并发上限
    RunSets {
        #[arg(required = true)]
        eval_set_ids: Vec<ScopeId>,
        #[arg(long)]
        global_concurrency: Option<usize>,
    },
    /// 后台提交任务，并轮询进度直到结束
    Submit {
        #[arg(required = true)]
        eval_set_ids: Vec<ScopeId>,
        #[arg(long)]
        global_concurrency: Option<usize>,
    },
}

/// 指定路径时读取该文件，否则按默认规则查找，最后叠加环境变量
fn load_config(path: Option<&str>) -> AppResult<Config> {
    let config = match path {
        Some(path) => Config::from_toml_file(path)?.with_env_overrides()?,
        None => Config::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = load_config(cli.config.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);
    logging::log_startup(&config);

    let poll_interval = config.poll_interval();
    let orchestrator = Orchestrator::from_config(config).context("初始化客户端失败")?;

    match cli.command {
        Command::RunSet {
            eval_set_id,
            concurrency,
        } => {
            let batch = orchestrator.run_scope(eval_set_id, concurrency).await;
            logging::print_final_stats(batch.succeeded, batch.failed, batch.total);
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
        Command::RunSets {
            eval_set_ids,
            global_concurrency,
        } => {
            let result = orchestrator
                .run_scopes(eval_set_ids, global_concurrency)
                .await;
            logging::print_final_stats(
                result.overall_succeeded,
                result.overall_failed,
                result.overall_total,
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Submit {
            mut eval_set_ids,
            global_concurrency,
        } => {
            let spec = if eval_set_ids.len() == 1 {
                JobSpec::single(eval_set_ids.remove(0))
            } else {
                JobSpec::multi(eval_set_ids)
            };
            let spec = match global_concurrency {
                Some(concurrency) => spec.with_concurrency(concurrency),
                None => spec,
            };

            let job_id = orchestrator.submit_job(spec).await;
            println!("{}", job_id);

            let view = orchestrator
                .status_query()
                .poll_until_terminal(job_id, poll_interval, |view| {
                    if view.total_known() {
                        tracing::info!("⏳ [任务 {}] {} {}/{}", job_id, view.status, view.processed, view.total);
                    } else {
                        tracing::info!("⏳ [任务 {}] {} 正在枚举条目...", job_id, view.status);
                    }
                })
                .await
                .context("查询任务状态失败")?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}
