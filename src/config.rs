use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

/// 部分章节请求失败时的处理策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// 任一请求失败即终止整个评审
    #[default]
    Abort,
    /// 记录失败，继续用其余章节生成报告
    BestEffort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "abort" | "abort-all" => Ok(FailurePolicy::Abort),
            "best-effort" | "partial" => Ok(FailurePolicy::BestEffort),
            other => Err(format!("未知的失败策略: {}", other)),
        }
    }
}

/// 评审方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewMode {
    /// 按章节切分，每个章节单独请求内容反馈和写作反馈
    #[default]
    Sections,
    /// 不切分，每个评审标准都对全文请求一次
    WholeDocument,
}

impl FromStr for ReviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "sections" | "section" => Ok(ReviewMode::Sections),
            "whole-document" | "whole" | "document" => Ok(ReviewMode::WholeDocument),
            other => Err(format!("未知的评审方式: {}", other)),
        }
    }
}

/// 程序配置
///
/// 每次评审运行构造一份，显式传给 `ReviewRunner`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 图片描述使用的视觉模型
    pub image_model_name: String,
    /// 部分推理模型不接受 temperature，默认不发送
    pub temperature: Option<f32>,
    pub max_completion_tokens: u32,
    // --- 运行配置 ---
    /// 同时进行的 LLM 请求数量
    pub max_concurrent_requests: usize,
    pub failure_policy: FailurePolicy,
    pub review_mode: ReviewMode,
    /// 是否额外请求写作质量反馈
    pub writing_feedback: bool,
    /// 是否把文档中的图片替换为文字描述
    pub describe_images: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "o4-mini".to_string(),
            image_model_name: "gpt-4o-mini".to_string(),
            temperature: None,
            max_completion_tokens: 16_000,
            max_concurrent_requests: 8,
            failure_policy: FailurePolicy::Abort,
            review_mode: ReviewMode::Sections,
            writing_feedback: true,
            describe_images: true,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件加载，缺失字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 先读配置文件（如果有），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.apply_env(|name| std::env::var(name).ok())
    }

    /// 用环境变量覆盖已有配置
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.llm_api_key = v;
        }
        if let Some(v) = lookup("OPENAI_API_BASE") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("REVIEW_MODEL") {
            self.llm_model_name = v;
        }
        if let Some(v) = lookup("IMAGE_MODEL") {
            self.image_model_name = v;
        }
        if let Some(v) = lookup("REVIEW_TEMPERATURE") {
            self.temperature = Some(parse_var("REVIEW_TEMPERATURE", &v, "f32")?);
        }
        if let Some(v) = lookup("MAX_CONCURRENT_REQUESTS") {
            self.max_concurrent_requests = parse_var("MAX_CONCURRENT_REQUESTS", &v, "usize")?;
        }
        if let Some(v) = lookup("FAILURE_POLICY") {
            self.failure_policy = parse_var("FAILURE_POLICY", &v, "FailurePolicy")?;
        }
        if let Some(v) = lookup("REVIEW_MODE") {
            self.review_mode = parse_var("REVIEW_MODE", &v, "ReviewMode")?;
        }
        if let Some(v) = lookup("WRITING_FEEDBACK") {
            self.writing_feedback = parse_var("WRITING_FEEDBACK", &v, "bool")?;
        }
        if let Some(v) = lookup("DESCRIBE_IMAGES") {
            self.describe_images = parse_var("DESCRIBE_IMAGES", &v, "bool")?;
        }
        if let Some(v) = lookup("VERBOSE_LOGGING") {
            self.verbose_logging = parse_var("VERBOSE_LOGGING", &v, "bool")?;
        }
        Ok(self)
    }
}

fn parse_var<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
}
