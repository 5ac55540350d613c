//! 章节评审流程 - 流程层
//!
//! 核心职责：定义"一个章节"的完整评审流程
//!
//! 流程顺序：
//! 1. 空章节直接返回空反馈（不调用模型）
//! 2. 内容反馈（章节评审标准 + 全文上下文 + 章节正文）
//! 3. 写作反馈（写作评审标准 + 章节正文），与第 2 步并发
//! 4. 校验并填写所属章节

use futures::future::try_join;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, LlmError};
use crate::models::{FeedbackIssueList, FeedbackKind, SectionFeedback, SectionName};
use crate::services::document_loader::OCR_START_MARKER;
use crate::services::llm_service::{FeedbackRequest, ReviewModel};
use crate::services::prompt_registry;
use crate::workflow::section_ctx::SectionCtx;

const CONTENT_SYSTEM_MESSAGE: &str = "You are an academic writing assistant analyzing a thesis proposal section.
Please provide your feedback as structured issues focusing on CONTENT, STRUCTURE, and COHERENCE.
Consider how this section connects with the rest of the proposal.
Focus on identifying specific problems and providing actionable suggestions.";

const WRITING_SYSTEM_MESSAGE: &str = "You are an academic writing assistant analyzing the writing quality of a thesis proposal section.
Please provide your feedback as structured issues focusing ONLY on WRITING STYLE, GRAMMAR, and CLARITY.
Do not analyze content or structure - focus exclusively on the writing mechanics.";

/// 构建内容反馈请求
pub fn content_request(
    section: SectionName,
    section_text: &str,
    full_document: &str,
) -> FeedbackRequest {
    let upper = section.key().to_uppercase();
    let mut rubric = prompt_registry::section_prompt(section).to_string();
    // 含图片描述的章节追加图表评审标准
    if section_text.contains(OCR_START_MARKER) {
        rubric.push_str("\n\n");
        rubric.push_str(&prompt_registry::lookup(prompt_registry::DIAGRAMS_FIGURES));
    }
    let user_message = format!(
        "{rubric}\n\nI want you to focus on the {upper} section, but consider the context of the entire proposal when giving feedback.\n\nHere is the FULL PROPOSAL for context:\n{full_document}\n\nHere is the specific {upper} section to focus on:\n{section_text}\n",
    );

    FeedbackRequest {
        section,
        kind: FeedbackKind::Content,
        system_message: CONTENT_SYSTEM_MESSAGE.to_string(),
        user_message,
    }
}

/// 构建写作反馈请求（只包含章节正文）
pub fn writing_request(section: SectionName, section_text: &str) -> FeedbackRequest {
    let user_message = format!(
        "{rubric}\n\nHere is the {upper} section to evaluate for writing quality:\n{section_text}\n",
        rubric = prompt_registry::writing_prompt(),
        upper = section.key().to_uppercase(),
    );

    FeedbackRequest {
        section,
        kind: FeedbackKind::Writing,
        system_message: WRITING_SYSTEM_MESSAGE.to_string(),
        user_message,
    }
}

/// 章节评审流程
///
/// - 编排单个章节的两类反馈请求
/// - 通过共享的 Semaphore 限制同时进行的模型调用
/// - 只依赖业务能力（`ReviewModel`）
pub struct SectionFlow {
    model: Arc<dyn ReviewModel>,
    semaphore: Arc<Semaphore>,
    writing_feedback: bool,
}

impl SectionFlow {
    /// 创建新的章节评审流程
    ///
    /// # 参数
    /// - `model`: 模型能力
    /// - `semaphore`: 全局请求并发许可
    /// - `writing_feedback`: 是否请求写作反馈
    pub fn new(
        model: Arc<dyn ReviewModel>,
        semaphore: Arc<Semaphore>,
        writing_feedback: bool,
    ) -> Self {
        Self {
            model,
            semaphore,
            writing_feedback,
        }
    }

    pub async fn run(
        &self,
        ctx: &SectionCtx,
        section_text: &str,
        full_document: &str,
    ) -> AppResult<SectionFeedback> {
        if section_text.trim().is_empty() {
            info!("{} 章节为空，跳过", ctx);
            return Ok(SectionFeedback::default());
        }

        info!(
            "{} 🔍 开始评审 ({} 字符)",
            ctx,
            section_text.chars().count()
        );

        let content = content_request(ctx.section, section_text, full_document);

        let feedback = if self.writing_feedback {
            let writing = writing_request(ctx.section, section_text);
            let (content_issues, writing_issues) =
                try_join(self.request(ctx, &content), self.request(ctx, &writing)).await?;
            SectionFeedback::new(content_issues, writing_issues)
        } else {
            let content_issues = self.request(ctx, &content).await?;
            SectionFeedback::new(content_issues, FeedbackIssueList::empty())
        };

        info!(
            "{} ✓ 评审完成: 内容反馈 {} 条，写作反馈 {} 条",
            ctx,
            feedback.content_issues.len(),
            feedback.writing_issues.len()
        );

        Ok(feedback)
    }

    async fn request(
        &self,
        ctx: &SectionCtx,
        request: &FeedbackRequest,
    ) -> AppResult<FeedbackIssueList> {
        send_request(self.model.as_ref(), &self.semaphore, ctx, request).await
    }
}

/// 在并发许可内发送一次请求，并校验返回结果
///
/// 模型侧的失败统一包装为 `LlmError::SectionFailed`
pub(crate) async fn send_request(
    model: &dyn ReviewModel,
    semaphore: &Semaphore,
    ctx: &SectionCtx,
    request: &FeedbackRequest,
) -> AppResult<FeedbackIssueList> {
    let _permit = semaphore.acquire().await?;
    debug!("{} 请求{}反馈", ctx, request.kind);

    let result = match model.request_issues(request).await {
        Ok(list) => list.into_validated(ctx.section).map_err(AppError::from),
        Err(e) => Err(e),
    };

    result.map_err(|e| {
        warn!("{} ⚠️ {}反馈请求失败: {}", ctx, request.kind, e);
        LlmError::SectionFailed {
            section: ctx.section,
            kind: request.kind,
            message: e.to_string(),
        }
        .into()
    })
}
