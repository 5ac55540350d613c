//! 评审运行器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个评审的入口，负责一次评审运行的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **文档加载**：委托 `DocumentLoader` 读取并清洗输入文件
//! 2. **章节抽取**：委托 `SectionExtractor` 切分章节
//! 3. **并发调度**：每个评审单元一个任务（`JoinSet`），共享的 Semaphore 限制全部模型调用（包括图片描述）
//! 4. **失败策略**：abort 时第一个失败即终止全部任务；best-effort 时记录失败继续
//! 5. **结果聚合**：按规范章节顺序构建 `Report`
//!
//! ## 评审方式
//!
//! - `sections`：每个非空章节一个任务，委托 `SectionFlow`
//! - `whole-document`：每个评审标准一个任务，委托 `DocumentFlow`
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个章节的细节
//! - **资源所有者**：唯一持有模型客户端、配置和并发许可的模块

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::{Config, FailurePolicy, ReviewMode};
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{Report, ReviewOutcome, SectionFailure, SectionFeedback, SectionName, Sections};
use crate::services::{DocumentLoader, LlmService, ReviewModel, SectionExtractor};
use crate::utils::logging;
use crate::workflow::document_flow::anchor_section;
use crate::workflow::{DocumentFlow, SectionCtx, SectionFlow};

/// 一个评审任务的结果：任务对应的章节，以及按章节归类的反馈
type TaskResult = (SectionName, AppResult<Vec<(SectionName, SectionFeedback)>>);

/// 评审运行器
pub struct ReviewRunner {
    config: Config,
    model: Arc<dyn ReviewModel>,
    semaphore: Arc<Semaphore>,
    extractor: SectionExtractor,
    loader: DocumentLoader,
}

impl ReviewRunner {
    /// 使用真实 LLM 服务创建
    pub fn new(config: Config) -> AppResult<Self> {
        let model: Arc<dyn ReviewModel> = Arc::new(LlmService::new(&config));
        Self::with_model(config, model)
    }

    /// 使用指定的模型能力创建
    pub fn with_model(config: Config, model: Arc<dyn ReviewModel>) -> AppResult<Self> {
        let describer = config.describe_images.then(|| model.clone());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));

        Ok(Self {
            extractor: SectionExtractor::new()?,
            loader: DocumentLoader::new(describer, semaphore.clone())?,
            semaphore,
            config,
            model,
        })
    }

    /// 评审一个输入文件
    pub async fn run(&self, path: &Path) -> AppResult<ReviewOutcome> {
        info!("\n📁 正在加载文档...");
        let text = self.loader.load(path).await?;
        self.review_text(&text).await
    }

    /// 评审已加载的文档文本
    pub async fn review_text(&self, text: &str) -> AppResult<ReviewOutcome> {
        let sections = self.extractor.extract(text);
        logging::log_sections_extracted(&sections);

        let tasks = match self.config.review_mode {
            ReviewMode::Sections => self.spawn_section_tasks(&sections, text),
            ReviewMode::WholeDocument => self.spawn_document_tasks(sections, text),
        };

        match tasks {
            Some(tasks) => self.collect(tasks).await,
            None => {
                warn!("⚠️ 没有找到任何可评审的内容");
                Ok(ReviewOutcome::default())
            }
        }
    }

    /// 每个非空章节一个任务
    fn spawn_section_tasks(&self, sections: &Sections, text: &str) -> Option<JoinSet<TaskResult>> {
        let targets: Vec<(SectionName, String)> = sections
            .iter()
            .filter(|(_, content)| !content.trim().is_empty())
            .map(|(name, content)| (name, content.to_string()))
            .collect();

        if targets.is_empty() {
            return None;
        }

        let total = targets.len();
        log_review_start(self.config.review_mode, total, self.config.max_concurrent_requests.max(1));

        let flow = Arc::new(SectionFlow::new(
            self.model.clone(),
            self.semaphore.clone(),
            self.config.writing_feedback,
        ));
        let full_document: Arc<str> = Arc::from(text);

        let mut tasks = JoinSet::new();
        for (idx, (section, content)) in targets.into_iter().enumerate() {
            let ctx = SectionCtx::new(section, idx + 1, total);
            let flow = flow.clone();
            let full_document = full_document.clone();

            tasks.spawn(async move {
                let result = flow
                    .run(&ctx, &content, &full_document)
                    .await
                    .map(|feedback| vec![(section, feedback)]);
                (section, result)
            });
        }

        Some(tasks)
    }

    /// 每个评审标准一个任务，全部针对全文
    fn spawn_document_tasks(&self, sections: Sections, text: &str) -> Option<JoinSet<TaskResult>> {
        if text.trim().is_empty() {
            return None;
        }

        let total = SectionName::ALL.len() + usize::from(self.config.writing_feedback);
        log_review_start(self.config.review_mode, total, self.config.max_concurrent_requests.max(1));

        let flow = Arc::new(DocumentFlow::new(self.model.clone(), self.semaphore.clone()));
        let full_document: Arc<str> = Arc::from(text);

        let mut tasks = JoinSet::new();
        for (idx, section) in SectionName::ALL.into_iter().enumerate() {
            let ctx = SectionCtx::new(section, idx + 1, total);
            let flow = flow.clone();
            let full_document = full_document.clone();

            tasks.spawn(async move {
                let result = flow
                    .review_rubric(&ctx, &full_document)
                    .await
                    .map(|feedback| vec![(section, feedback)]);
                (section, result)
            });
        }

        if self.config.writing_feedback {
            let anchor = anchor_section(&sections);
            let ctx = SectionCtx::new(anchor, total, total);

            tasks.spawn(async move {
                let result = flow.review_writing(&ctx, &full_document, &sections).await;
                (anchor, result)
            });
        }

        Some(tasks)
    }

    /// 等待所有任务并应用失败策略
    async fn collect(&self, mut tasks: JoinSet<TaskResult>) -> AppResult<ReviewOutcome> {
        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut succeeded = 0;

        while let Some(joined) = tasks.join_next().await {
            let (section, result) = joined?;

            match result {
                Ok(feedback) => {
                    succeeded += 1;
                    results.extend(feedback);
                }
                Err(e) => match (self.config.failure_policy, e) {
                    (
                        FailurePolicy::BestEffort,
                        AppError::Llm(LlmError::SectionFailed { section, kind, message }),
                    ) => {
                        warn!(
                            "⚠️ {} 章节{}反馈失败，继续处理其余任务: {}",
                            section.display_name(),
                            kind,
                            message
                        );
                        failures.push(SectionFailure { section, kind, message });
                    }
                    (_, e) => {
                        error!("❌ {} 评审失败，终止其余任务: {}", section.display_name(), e);
                        tasks.abort_all();
                        return Err(e);
                    }
                },
            }
        }

        failures.sort_by_key(|failure| (failure.section, failure.kind));
        log_review_complete(succeeded, failures.len());

        Ok(ReviewOutcome {
            report: Report::from_sections(results),
            failures,
        })
    }
}

// ========== 日志辅助函数 ==========

fn log_review_start(mode: ReviewMode, total: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    match mode {
        ReviewMode::Sections => info!("📦 开始评审 {} 个章节", total),
        ReviewMode::WholeDocument => info!("📦 开始整篇评审: {} 项评审标准", total),
    }
    info!("📊 最大并发请求: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

fn log_review_complete(success: usize, failed: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 评审完成: 成功 {}/{}", success, success + failed);
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedbackKind;
    use crate::services::document_loader::OCR_START_MARKER;
    use crate::test_support::MockModel;

    const DOC: &str = "Thesis Proposal\n\nAbstract\nWe study things.\n\nIntroduction\nContext here.\n\nMotivation\nIt matters.\n\nSchedule\nMonth 1: read.\n";

    fn runner(model: Arc<MockModel>, policy: FailurePolicy) -> ReviewRunner {
        let config = Config {
            failure_policy: policy,
            max_concurrent_requests: 2,
            ..Config::default()
        };
        ReviewRunner::with_model(config, model).unwrap()
    }

    #[tokio::test]
    async fn test_only_non_empty_sections_are_reviewed() {
        let model = Arc::new(MockModel::new());
        let outcome = runner(model.clone(), FailurePolicy::Abort)
            .review_text(DOC)
            .await
            .unwrap();

        assert!(outcome.is_complete());
        let reviewed: Vec<SectionName> = outcome.report.sections().map(|(name, _)| name).collect();
        assert_eq!(
            reviewed,
            vec![
                SectionName::Abstract,
                SectionName::Introduction,
                SectionName::Motivation,
                SectionName::Schedule,
            ]
        );
        assert_eq!(model.content_calls(), 4);
        assert_eq!(model.writing_calls(), 4);
        assert!(model.peak_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_abort_policy_fails_run() {
        let model = Arc::new(MockModel::new().failing_on(SectionName::Introduction));
        let err = runner(model, FailurePolicy::Abort)
            .review_text(DOC)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Llm(LlmError::SectionFailed {
                section: SectionName::Introduction,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_best_effort_keeps_other_sections() {
        let model = Arc::new(
            MockModel::new()
                .failing_on(SectionName::Schedule)
                .failing_on(SectionName::Abstract),
        );
        let outcome = runner(model, FailurePolicy::BestEffort)
            .review_text(DOC)
            .await
            .unwrap();

        assert!(!outcome.is_complete());
        let failed: Vec<(SectionName, FeedbackKind)> =
            outcome.failures.iter().map(|f| (f.section, f.kind)).collect();
        // 内容和写作请求都失败时，先返回的那个决定失败类型
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].0, SectionName::Abstract);
        assert_eq!(failed[1].0, SectionName::Schedule);
        assert!(outcome.failures.iter().all(|f| f.message.contains("mock")));
        assert_eq!(outcome.report.section_count(), 2);
        assert!(outcome.report.get(SectionName::Abstract).is_none());
        assert!(outcome.report.get(SectionName::Motivation).is_some());
    }

    #[tokio::test]
    async fn test_document_without_headings() {
        let model = Arc::new(MockModel::new());
        let outcome = runner(model.clone(), FailurePolicy::Abort)
            .review_text("just some prose without any structure")
            .await
            .unwrap();

        assert_eq!(outcome.report.section_count(), 0);
        assert_eq!(model.content_calls(), 0);
    }

    #[tokio::test]
    async fn test_images_skipped_when_disabled() {
        let model = Arc::new(MockModel::new());
        let config = Config {
            describe_images: false,
            ..Config::default()
        };
        let runner = ReviewRunner::with_model(config, model.clone()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.md");
        tokio::fs::write(&path, "Abstract\nSee ![](figure.png) here.\n")
            .await
            .unwrap();

        let outcome = runner.run(&path).await.unwrap();
        assert_eq!(model.image_calls(), 0);
        assert_eq!(outcome.report.section_count(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_records_failed_kind() {
        let model = Arc::new(MockModel::new().failing_on(SectionName::Motivation));
        let config = Config {
            failure_policy: FailurePolicy::BestEffort,
            writing_feedback: false,
            ..Config::default()
        };
        let outcome = ReviewRunner::with_model(config, model)
            .unwrap()
            .review_text(DOC)
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].section, SectionName::Motivation);
        assert_eq!(outcome.failures[0].kind, FeedbackKind::Content);
    }

    #[tokio::test]
    async fn test_image_descriptions_share_request_limit() {
        let model = Arc::new(MockModel::new());
        let config = Config {
            max_concurrent_requests: 2,
            describe_images: true,
            ..Config::default()
        };
        let runner = ReviewRunner::with_model(config, model.clone()).unwrap();

        let figures: String = (0..20).map(|i| format!("![](figure{i}.png)\n")).collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.md");
        tokio::fs::write(&path, format!("Abstract\nSee the figures.\n{figures}"))
            .await
            .unwrap();

        let outcome = runner.run(&path).await.unwrap();

        assert_eq!(model.image_calls(), 20);
        assert!(model.peak_in_flight() <= 2);
        assert_eq!(outcome.report.section_count(), 1);
        let content = model
            .requests()
            .into_iter()
            .find(|r| r.kind == FeedbackKind::Content)
            .unwrap();
        assert_eq!(content.user_message.matches(OCR_START_MARKER).count(), 40);
    }

    #[tokio::test]
    async fn test_whole_document_applies_every_rubric() {
        let model = Arc::new(MockModel::new().with_writing_quote("It matters."));
        let config = Config {
            review_mode: ReviewMode::WholeDocument,
            max_concurrent_requests: 3,
            ..Config::default()
        };
        let outcome = ReviewRunner::with_model(config, model.clone())
            .unwrap()
            .review_text(DOC)
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(model.content_calls(), 8);
        assert_eq!(model.writing_calls(), 1);
        assert!(model.peak_in_flight() <= 3);

        // 每个请求都带全文
        assert!(model.requests().iter().all(|r| r.user_message.contains(DOC)));

        let report = &outcome.report;
        assert_eq!(report.section_count(), 8);
        for section in SectionName::ALL {
            let feedback = report.get(section).unwrap();
            assert_eq!(feedback.content_issues.len(), 1);
        }

        // 写作反馈按引文归入 Motivation
        let motivation = report.get(SectionName::Motivation).unwrap();
        assert_eq!(motivation.writing_issues.len(), 1);
        assert_eq!(report.flat_issues().len(), 9);
        assert_eq!(report.total_issues(), 9);
    }

    #[tokio::test]
    async fn test_whole_document_without_headings_still_reviewed() {
        let model = Arc::new(MockModel::new());
        let config = Config {
            review_mode: ReviewMode::WholeDocument,
            writing_feedback: false,
            ..Config::default()
        };
        let outcome = ReviewRunner::with_model(config, model.clone())
            .unwrap()
            .review_text("just some prose without any structure")
            .await
            .unwrap();

        assert_eq!(model.content_calls(), 8);
        assert_eq!(model.writing_calls(), 0);
        assert_eq!(outcome.report.section_count(), 8);
    }

    #[tokio::test]
    async fn test_whole_document_failure_policy() {
        let model = Arc::new(MockModel::new().failing_on(SectionName::Bibliography));
        let config = Config {
            review_mode: ReviewMode::WholeDocument,
            failure_policy: FailurePolicy::BestEffort,
            ..Config::default()
        };
        let outcome = ReviewRunner::with_model(config, model)
            .unwrap()
            .review_text(DOC)
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].section, SectionName::Bibliography);
        assert_eq!(outcome.failures[0].kind, FeedbackKind::Content);
        assert_eq!(outcome.report.section_count(), 7);
    }
}
