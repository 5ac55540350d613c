//! # Proposal Reviewer
//!
//! 一个用 LLM 评审开题报告的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用三层架构：
//!
//! ### ① 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `DocumentLoader` - 读取 PDF / markdown，清洗页码，替换图片
//! - `SectionExtractor` - 按标题切分八个标准章节
//! - `prompt_registry` - 章节评审标准
//! - `LlmService` - 结构化反馈与图片描述能力（`ReviewModel`）
//! - `report_formatter` / `ReportWriter` - 渲染并写出报告
//!
//! ### ② 流程层（Workflow）
//! - `workflow/` - 定义"一个章节"的完整评审流程
//! - `SectionCtx` - 上下文封装（章节 + 序号）
//! - `SectionFlow` - 内容反馈与写作反馈并发请求
//! - `DocumentFlow` - 整篇评审：每个评审标准对全文请求一次
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/review_runner` - 加载文档、并发调度章节、应用失败策略、聚合报告
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod test_support;

// 重新导出常用类型
pub use config::{Config, FailurePolicy, ReviewMode};
pub use error::{AppError, AppResult};
pub use models::{FeedbackIssue, FeedbackIssueList, Priority, Report, ReviewOutcome, SectionName};
pub use orchestrator::ReviewRunner;
pub use services::{OutputPaths, ReportWriter, ReviewModel};
pub use workflow::{DocumentFlow, SectionCtx, SectionFlow};
