use thiserror::Error;

use crate::models::{FeedbackKind, SectionName};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 文档解析错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 报告生成错误
    #[error("报告错误: {0}")]
    Report(#[from] ReportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 后台任务异常退出
    #[error("任务执行失败: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// 并发许可获取失败
    #[error("并发控制失效: {0}")]
    Concurrency(#[from] tokio::sync::AcquireError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败 ({path}): {source}")]
    SerializeFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 文档解析错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// PDF 文本提取失败
    #[error("PDF文本提取失败 ({path}): {message}")]
    PdfExtract { path: String, message: String },
    /// 内置正则编译失败
    #[error("正则编译失败 ({name}): {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建LLM请求失败: {0}")]
    RequestBuild(#[source] async_openai::error::OpenAIError),
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 结构化输出无法解析
    #[error("LLM结构化输出无法解析 (模型: {model}): {source}")]
    MalformedOutput {
        model: String,
        #[source]
        source: serde_json::Error,
    },
    /// 结构化输出不满足约束
    #[error("LLM结构化输出不合法: {reason}")]
    InvalidIssue { reason: String },
    /// 某个章节的请求失败
    #[error("章节 {section} 的{kind}反馈请求失败: {message}")]
    SectionFailed {
        section: SectionName,
        kind: FeedbackKind,
        message: String,
    },
}

/// 报告生成错误
#[derive(Debug, Error)]
pub enum ReportError {
    /// 变更请求中出现未知章节
    #[error("未知章节: {label}")]
    UnknownSection { label: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件不存在错误
    pub fn file_not_found(path: impl Into<String>) -> Self {
        AppError::File(FileError::NotFound { path: path.into() })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: async_openai::error::OpenAIError,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source,
        })
    }

    /// 是否为输入文件缺失
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::File(FileError::NotFound { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
