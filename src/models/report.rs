//! 评审报告模型
//!
//! 汇总每个章节的内容反馈和写作反馈

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::feedback::{FeedbackIssue, FeedbackIssueList, FeedbackKind};
use crate::models::section::SectionName;

/// 单个章节的反馈
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFeedback {
    #[serde(default)]
    pub content_issues: Vec<FeedbackIssue>,
    #[serde(default)]
    pub writing_issues: Vec<FeedbackIssue>,
}

impl SectionFeedback {
    pub fn new(content: FeedbackIssueList, writing: FeedbackIssueList) -> Self {
        Self {
            content_issues: content.issues,
            writing_issues: writing.issues,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.content_issues.len() + self.writing_issues.len()
    }
}

/// 扁平列表中的一项，带反馈类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatIssue {
    #[serde(flatten)]
    pub issue: FeedbackIssue,
    pub feedback_type: FeedbackKind,
}

/// 评审报告
///
/// 按规范章节顺序保存，聚合完成后不再修改
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    sections: BTreeMap<SectionName, SectionFeedback>,
}

impl Report {
    /// 从各章节结果构建报告
    ///
    /// 同一章节出现多次时合并，列表按出现顺序追加
    pub fn from_sections(
        results: impl IntoIterator<Item = (SectionName, SectionFeedback)>,
    ) -> Self {
        let mut sections: BTreeMap<SectionName, SectionFeedback> = BTreeMap::new();
        for (section, feedback) in results {
            let entry = sections.entry(section).or_default();
            entry.content_issues.extend(feedback.content_issues);
            entry.writing_issues.extend(feedback.writing_issues);
        }
        Self { sections }
    }

    pub fn get(&self, section: SectionName) -> Option<&SectionFeedback> {
        self.sections.get(&section)
    }

    /// 按规范顺序遍历
    pub fn sections(&self) -> impl Iterator<Item = (SectionName, &SectionFeedback)> {
        self.sections.iter().map(|(name, feedback)| (*name, feedback))
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn total_issues(&self) -> usize {
        self.sections.values().map(SectionFeedback::issue_count).sum()
    }

    /// 扁平列表：章节按规范顺序，章节内先内容后写作，列表内保持模型输出顺序
    pub fn flat_issues(&self) -> Vec<FlatIssue> {
        let mut flat = Vec::with_capacity(self.total_issues());

        for (section, feedback) in &self.sections {
            let stamp = |issue: &FeedbackIssue, kind: FeedbackKind| {
                let mut issue = issue.clone();
                issue.section.get_or_insert(*section);
                FlatIssue {
                    issue,
                    feedback_type: kind,
                }
            };

            flat.extend(
                feedback
                    .content_issues
                    .iter()
                    .map(|issue| stamp(issue, FeedbackKind::Content)),
            );
            flat.extend(
                feedback
                    .writing_issues
                    .iter()
                    .map(|issue| stamp(issue, FeedbackKind::Writing)),
            );
        }

        flat
    }
}

/// 单个章节请求失败的记录（仅在尽力而为策略下产生）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionFailure {
    pub section: SectionName,
    pub kind: FeedbackKind,
    pub message: String,
}

/// 一次评审运行的结果
#[derive(Debug, Clone, Default)]
pub struct ReviewOutcome {
    pub report: Report,
    pub failures: Vec<SectionFailure>,
}

impl ReviewOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
