//! 反馈模型
//!
//! LLM 结构化输出的数据结构：单条反馈 `FeedbackIssue` 和一次调用的结果 `FeedbackIssueList`

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use crate::error::LlmError;
use crate::models::section::SectionName;

/// 优先级
///
/// 统一使用五级刻度；另一套三级刻度在解析时映射：
/// Minor → Low，Moderate → Medium，Major → High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Priority {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Priority {
    /// 从高到低
    pub const DESCENDING: [Priority; 5] = [
        Priority::VeryHigh,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::VeryLow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Priority::VeryLow => "Very Low",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::VeryHigh => "Very High",
        }
    }

    /// Markdown 报告使用的图标
    pub fn icon(self) -> &'static str {
        match self {
            Priority::VeryHigh => "🔴",
            Priority::High => "🟠",
            Priority::Medium => "🟡",
            Priority::Low => "🟢",
            Priority::VeryLow => "🔵",
        }
    }

    /// 纯文本报告使用的标记
    pub fn text_marker(self) -> &'static str {
        match self {
            Priority::VeryHigh => "[VERY HIGH]",
            Priority::High => "[HIGH]",
            Priority::Medium => "[MEDIUM]",
            Priority::Low => "[LOW]",
            Priority::VeryLow => "[VERY LOW]",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();

        match normalized.as_str() {
            "verylow" => Ok(Priority::VeryLow),
            "low" | "minor" => Ok(Priority::Low),
            "medium" | "moderate" => Ok(Priority::Medium),
            "high" | "major" => Ok(Priority::High),
            "veryhigh" | "critical" => Ok(Priority::VeryHigh),
            _ => Err(format!("无法识别的优先级: {}", s)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.label().to_string()
    }
}

/// 反馈类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    /// 内容、结构、连贯性
    Content,
    /// 语法、文风、清晰度
    Writing,
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackKind::Content => f.write_str("content"),
            FeedbackKind::Writing => f.write_str("writing"),
        }
    }
}

/// 单条反馈
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackIssue {
    /// 所属章节，由请求方在返回后填写
    #[serde(default)]
    pub section: Option<SectionName>,
    pub category: String,
    #[serde(alias = "severity")]
    pub priority: Priority,
    #[serde(default)]
    pub quote: Option<String>,
    pub issue: String,
    pub suggestion: String,
    #[serde(default)]
    pub rule: Option<String>,
}

impl FeedbackIssue {
    /// 校验必填字段，并把空白的可选字段归一为 None
    pub fn normalize(mut self) -> Result<Self, LlmError> {
        for (field, value) in [
            ("category", &self.category),
            ("issue", &self.issue),
            ("suggestion", &self.suggestion),
        ] {
            if value.trim().is_empty() {
                return Err(LlmError::InvalidIssue {
                    reason: format!("字段 {} 不能为空", field),
                });
            }
        }

        self.category = self.category.trim().to_string();
        self.issue = self.issue.trim().to_string();
        self.suggestion = self.suggestion.trim().to_string();
        self.quote = self.quote.filter(|q| !q.trim().is_empty());
        self.rule = self.rule.filter(|r| !r.trim().is_empty());

        Ok(self)
    }
}

/// 一次 LLM 调用返回的反馈列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackIssueList {
    pub issues: Vec<FeedbackIssue>,
}

impl FeedbackIssueList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// 校验每一条反馈并填写所属章节
    pub fn into_validated(self, section: SectionName) -> Result<Self, LlmError> {
        let issues = self
            .issues
            .into_iter()
            .map(|issue| {
                issue.normalize().map(|mut issue| {
                    issue.section = Some(section);
                    issue
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { issues })
    }

    /// 发给模型的 JSON Schema（strict 模式要求所有字段都列为 required）
    pub fn json_schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "issues": {
                    "type": "array",
                    "description": "List of feedback issues identified in the section",
                    "items": {
                        "type": "object",
                        "properties": {
                            "category": {
                                "type": "string",
                                "description": "Category of the issue (e.g., 'Clarity', 'Structure', 'Content', 'Grammar', 'Citations')"
                            },
                            "priority": {
                                "type": "string",
                                "enum": ["Very Low", "Low", "Medium", "High", "Very High"],
                                "description": "Priority of the issue"
                            },
                            "quote": {
                                "type": ["string", "null"],
                                "description": "A direct quote from the text illustrating the issue, if applicable"
                            },
                            "issue": {
                                "type": "string",
                                "description": "Description of the issue identified"
                            },
                            "suggestion": {
                                "type": "string",
                                "description": "Specific suggestion for addressing the issue"
                            },
                            "rule": {
                                "type": ["string", "null"],
                                "description": "The academic writing rule or guideline being applied, if relevant"
                            }
                        },
                        "required": ["category", "priority", "quote", "issue", "suggestion", "rule"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["issues"],
            "additionalProperties": false
        })
    }
}
