//! 整篇评审流程 - 流程层
//!
//! 核心职责：不依赖章节切分，对全文逐个应用评审标准
//!
//! 流程顺序：
//! 1. 八个章节评审标准各自对全文请求一次内容反馈
//! 2. 写作质量标准对全文请求一次写作反馈（可关闭）
//! 3. 写作反馈按引文所在章节归类，找不到引文时归入锚点章节

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{FeedbackIssue, FeedbackKind, SectionFeedback, SectionName, Sections};
use crate::services::llm_service::{FeedbackRequest, ReviewModel};
use crate::services::prompt_registry;
use crate::services::report_formatter::single_line;
use crate::workflow::section_ctx::SectionCtx;
use crate::workflow::section_flow::send_request;

const RUBRIC_SYSTEM_MESSAGE: &str = "You are an academic writing assistant reviewing a complete thesis proposal.
Please provide your feedback as structured issues that apply ONLY the evaluation criteria given below.
Quote the proposal text verbatim where possible and provide actionable suggestions.";

const WRITING_SYSTEM_MESSAGE: &str = "You are an academic writing assistant analyzing the writing quality of a complete thesis proposal.
Please provide your feedback as structured issues focusing ONLY on WRITING STYLE, GRAMMAR, and CLARITY.
Quote the affected text verbatim so each issue can be located in the proposal.";

/// 对全文应用某个章节的评审标准
pub fn rubric_request(section: SectionName, full_document: &str) -> FeedbackRequest {
    FeedbackRequest {
        section,
        kind: FeedbackKind::Content,
        system_message: RUBRIC_SYSTEM_MESSAGE.to_string(),
        user_message: format!(
            "{}\n\nHere is the FULL PROPOSAL to review:\n{}\n",
            prompt_registry::section_prompt(section),
            full_document
        ),
    }
}

/// 对全文应用写作质量标准
pub fn document_writing_request(anchor: SectionName, full_document: &str) -> FeedbackRequest {
    FeedbackRequest {
        section: anchor,
        kind: FeedbackKind::Writing,
        system_message: WRITING_SYSTEM_MESSAGE.to_string(),
        user_message: format!(
            "{}\n\nHere is the FULL PROPOSAL to evaluate for writing quality:\n{}\n",
            prompt_registry::writing_prompt(),
            full_document
        ),
    }
}

/// 锚点章节：第一个非空章节，全部为空时为 Abstract
pub fn anchor_section(sections: &Sections) -> SectionName {
    sections
        .iter()
        .find(|(_, text)| !text.trim().is_empty())
        .map(|(name, _)| name)
        .unwrap_or(SectionName::Abstract)
}

/// 按引文定位反馈所属章节（忽略空白差异）
pub fn attribute_issue(issue: &FeedbackIssue, sections: &Sections, fallback: SectionName) -> SectionName {
    let Some(quote) = issue
        .quote
        .as_deref()
        .map(single_line)
        .filter(|quote| !quote.is_empty())
    else {
        return fallback;
    };

    sections
        .iter()
        .find(|(_, text)| single_line(text).contains(&quote))
        .map(|(name, _)| name)
        .unwrap_or(fallback)
}

/// 整篇评审流程
pub struct DocumentFlow {
    model: Arc<dyn ReviewModel>,
    semaphore: Arc<Semaphore>,
}

impl DocumentFlow {
    pub fn new(model: Arc<dyn ReviewModel>, semaphore: Arc<Semaphore>) -> Self {
        Self { model, semaphore }
    }

    /// 用某个章节的评审标准评审全文
    pub async fn review_rubric(
        &self,
        ctx: &SectionCtx,
        full_document: &str,
    ) -> AppResult<SectionFeedback> {
        info!("{} 🔍 按评审标准审阅全文", ctx);

        let request = rubric_request(ctx.section, full_document);
        let issues = send_request(self.model.as_ref(), &self.semaphore, ctx, &request).await?;

        info!("{} ✓ 内容反馈 {} 条", ctx, issues.len());
        Ok(SectionFeedback {
            content_issues: issues.issues,
            writing_issues: Vec::new(),
        })
    }

    /// 对全文请求写作反馈，并按章节归类
    ///
    /// `ctx.section` 作为找不到引文时的归属章节
    pub async fn review_writing(
        &self,
        ctx: &SectionCtx,
        full_document: &str,
        sections: &Sections,
    ) -> AppResult<Vec<(SectionName, SectionFeedback)>> {
        info!("{} 🔍 审阅全文写作质量", ctx);

        let request = document_writing_request(ctx.section, full_document);
        let issues = send_request(self.model.as_ref(), &self.semaphore, ctx, &request).await?;

        info!("{} ✓ 写作反馈 {} 条", ctx, issues.len());

        let grouped = issues
            .issues
            .into_iter()
            .map(|mut issue| {
                let section = attribute_issue(&issue, sections, ctx.section);
                debug!("写作反馈归入 {}: {}", section, issue.issue);
                issue.section = Some(section);
                (
                    section,
                    SectionFeedback {
                        content_issues: Vec::new(),
                        writing_issues: vec![issue],
                    },
                )
            })
            .collect();

        Ok(grouped)
    }
}
