//! 日志工具模块
//!
//! 提供日志初始化以及运行进度的格式化输出

use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{ReviewOutcome, Sections};

/// 初始化 tracing 订阅器
///
/// 优先使用 `RUST_LOG`，否则 verbose 时为 debug，默认 info。重复调用无副作用。
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
///
/// # 参数
/// - `config`: 本次运行的配置
/// - `input`: 输入文件路径
pub fn log_startup(config: &Config, input: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 开题报告评审启动");
    info!("📄 输入文件: {}", input);
    info!(
        "🤖 模型: {} | 最大并发请求: {}",
        config.llm_model_name, config.max_concurrent_requests
    );
    info!(
        "📝 写作反馈: {} | 失败策略: {:?} | 评审方式: {:?}",
        if config.writing_feedback { "开启" } else { "关闭" },
        config.failure_policy,
        config.review_mode
    );
    info!("{}", "=".repeat(60));
}

/// 记录章节抽取结果
pub fn log_sections_extracted(sections: &Sections) {
    info!(
        "✓ 抽取到 {} 个非空章节",
        sections.non_empty_count()
    );
    for (name, text) in sections.iter() {
        if text.trim().is_empty() {
            info!("  - {:<13} (未找到，跳过)", name.display_name());
        } else {
            info!("  - {:<13} {} 字符", name.display_name(), text.chars().count());
        }
    }
}

/// 打印最终统计信息
///
/// # 参数
/// - `outcome`: 评审结果
/// - `elapsed`: 总耗时
pub fn print_final_stats(outcome: &ReviewOutcome, elapsed: Duration) {
    info!("\n{}", "=".repeat(60));
    info!("📊 评审完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已评审章节: {}", outcome.report.section_count());
    info!("📝 反馈总数: {}", outcome.report.total_issues());
    if !outcome.failures.is_empty() {
        info!("❌ 失败章节: {}", outcome.failures.len());
    }
    info!("⏱️ 耗时: {:.2} 秒", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
