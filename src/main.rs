use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

use proposal_reviewer::utils::logging;
use proposal_reviewer::{
    Config, FailurePolicy, OutputPaths, ReportWriter, ReviewMode, ReviewRunner,
};

/// 开题报告评审命令行
#[derive(Parser, Debug)]
#[command(name = "proposal-reviewer")]
#[command(version, about = "Review a thesis proposal with an LLM, section by section or as a whole")]
struct Cli {
    /// Proposal file (PDF, markdown or plain text)
    input: PathBuf,

    /// Markdown report path
    #[arg(short, long, default_value = "review_results.md")]
    output: PathBuf,

    /// Grouped JSON feedback path
    #[arg(long, default_value = "output/feedback.json")]
    json_output: PathBuf,

    /// Flat JSON feedback path
    #[arg(long, default_value = "output/flat_feedback.json")]
    flat_json_output: PathBuf,

    /// Change requests path (one per line)
    #[arg(long, default_value = "output/change_requests.txt")]
    change_requests: PathBuf,

    /// Optional plain-text report path
    #[arg(long)]
    plain_output: Option<PathBuf>,

    /// Review model (default o4-mini)
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// abort | best-effort
    #[arg(long, value_name = "POLICY")]
    failure_policy: Option<FailurePolicy>,

    /// sections | whole-document
    #[arg(long, value_name = "MODE")]
    mode: Option<ReviewMode>,

    /// Skip writing-quality feedback
    #[arg(long)]
    content_only: bool,

    /// Drop images instead of describing them
    #[arg(long)]
    no_images: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖配置文件和环境变量
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.llm_model_name = model.clone();
        }
        if let Some(policy) = self.failure_policy {
            config.failure_policy = policy;
        }
        if let Some(mode) = self.mode {
            config.review_mode = mode;
        }
        if self.content_only {
            config.writing_feedback = false;
        }
        if self.no_images {
            config.describe_images = false;
        }
        if self.verbose {
            config.verbose_logging = true;
        }
    }

    fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            markdown: Some(self.output.clone()),
            json: Some(self.json_output.clone()),
            flat_json: Some(self.flat_json_output.clone()),
            change_requests: Some(self.change_requests.clone()),
            plain_text: self.plain_output.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load(cli.config.as_deref()).context("加载配置失败")?;
    cli.apply(&mut config);

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config, &cli.input.display().to_string());

    let started = Instant::now();

    // 初始化并运行评审
    let runner = ReviewRunner::new(config)?;
    let outcome = runner
        .run(&cli.input)
        .await
        .with_context(|| format!("评审失败: {}", cli.input.display()))?;

    for failure in &outcome.failures {
        warn!(
            "⚠️ 未包含在报告中: {} {}反馈 ({})",
            failure.section.display_name(),
            failure.kind,
            failure.message
        );
    }

    ReportWriter::new(cli.output_paths())
        .write_all(&outcome.report)
        .await
        .context("写出报告失败")?;

    logging::print_final_stats(&outcome, started.elapsed());
    println!("Review completed and saved to {}", cli.output.display());

    Ok(())
}
