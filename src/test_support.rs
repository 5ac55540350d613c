//! 单元测试用的假模型

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AppResult, LlmError};
use crate::models::{FeedbackIssue, FeedbackIssueList, FeedbackKind, Priority, SectionName};
use crate::services::llm_service::{FeedbackRequest, ReviewModel};

/// 计数的假模型
///
/// 内容反馈返回一条 High 级别的反馈；写作反馈默认返回空列表，
/// 设置 `writing_quote` 后返回一条引用该文本的反馈
pub(crate) struct MockModel {
    writing_quote: Option<String>,
    fail_sections: Vec<SectionName>,
    fail_images: bool,
    delay: Duration,
    content_calls: AtomicUsize,
    writing_calls: AtomicUsize,
    image_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<FeedbackRequest>>,
}

impl MockModel {
    pub(crate) fn new() -> Self {
        Self {
            writing_quote: None,
            fail_sections: Vec::new(),
            fail_images: false,
            delay: Duration::from_millis(5),
            content_calls: AtomicUsize::new(0),
            writing_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_on(mut self, section: SectionName) -> Self {
        self.fail_sections.push(section);
        self
    }

    pub(crate) fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub(crate) fn with_writing_quote(mut self, quote: &str) -> Self {
        self.writing_quote = Some(quote.to_string());
        self
    }

    pub(crate) fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn writing_calls(&self) -> usize {
        self.writing_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<FeedbackRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// 模拟一次耗时调用，记录同时进行的调用数峰值（文本和图片请求共用）
    async fn simulate_call(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReviewModel for MockModel {
    async fn request_issues(&self, request: &FeedbackRequest) -> AppResult<FeedbackIssueList> {
        self.requests.lock().unwrap().push(request.clone());
        match request.kind {
            FeedbackKind::Content => self.content_calls.fetch_add(1, Ordering::SeqCst),
            FeedbackKind::Writing => self.writing_calls.fetch_add(1, Ordering::SeqCst),
        };

        self.simulate_call().await;

        if self.fail_sections.contains(&request.section) {
            return Err(LlmError::EmptyContent {
                model: "mock".to_string(),
            }
            .into());
        }

        let issues = match request.kind {
            FeedbackKind::Content => vec![FeedbackIssue {
                section: None,
                category: "Structure".to_string(),
                priority: Priority::High,
                quote: None,
                issue: format!("{} needs work", request.section.display_name()),
                suggestion: "Tighten the argument".to_string(),
                rule: None,
            }],
            FeedbackKind::Writing => self
                .writing_quote
                .iter()
                .map(|quote| FeedbackIssue {
                    section: None,
                    category: "Grammar".to_string(),
                    priority: Priority::Low,
                    quote: Some(quote.clone()),
                    issue: "Awkward phrasing".to_string(),
                    suggestion: "Rephrase the sentence".to_string(),
                    rule: None,
                })
                .collect(),
        };

        Ok(FeedbackIssueList { issues })
    }

    async fn describe_image(&self, image_url: &str) -> AppResult<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await;

        if self.fail_images {
            return Err(LlmError::EmptyContent {
                model: "mock-vision".to_string(),
            }
            .into());
        }
        Ok(format!("description of {}", image_url))
    }
}
