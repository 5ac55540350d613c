//! 报告写入服务 - 业务能力层
//!
//! 只负责"把评审结果写到磁盘"能力，不关心流程

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::Report;
use crate::services::report_formatter;

/// 输出文件路径，None 表示不写该文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    pub markdown: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub flat_json: Option<PathBuf>,
    pub change_requests: Option<PathBuf>,
    pub plain_text: Option<PathBuf>,
}

/// 报告写入服务
///
/// 职责：
/// - 按路径写出各种格式的报告
/// - 自动创建父目录
/// - 不关心报告如何生成
pub struct ReportWriter {
    paths: OutputPaths,
}

impl ReportWriter {
    pub fn new(paths: OutputPaths) -> Self {
        Self { paths }
    }

    /// 写出全部已配置的文件
    ///
    /// # 返回
    /// 返回实际写入的文件路径
    pub async fn write_all(&self, report: &Report) -> AppResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        if let Some(path) = &self.paths.json {
            write_json(path, report).await?;
            written.push(path.clone());
        }

        if let Some(path) = &self.paths.flat_json {
            write_json(path, &report.flat_issues()).await?;
            written.push(path.clone());
        }

        if let Some(path) = &self.paths.change_requests {
            let lines = report_formatter::change_requests(report)?;
            let content: String = lines.iter().map(|line| format!("{}\n", line)).collect();
            write_text(path, &content).await?;
            written.push(path.clone());
        }

        if let Some(path) = &self.paths.markdown {
            write_text(path, &report_formatter::render_markdown(report)).await?;
            written.push(path.clone());
        }

        if let Some(path) = &self.paths.plain_text {
            write_text(path, &report_formatter::render_plain_text(report)).await?;
            written.push(path.clone());
        }

        for path in &written {
            info!("💾 已保存: {}", path.display());
        }

        Ok(written)
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| FileError::SerializeFailed {
        path: path.display().to_string(),
        source,
    })?;
    write_text(path, &json).await
}

async fn write_text(path: &Path, content: &str) -> AppResult<()> {
    let path_str = path.display().to_string();
    debug!("写入文件: {} ({} 字节)", path_str, content.len());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(&path_str, e))
}
