//! 文档加载服务 - 业务能力层
//!
//! 只负责"把输入文件变成纯文本"能力：
//! - PDF 通过 `pdf-extract` 提取文本，其余扩展名按 UTF-8 文本读取
//! - 删除只包含页码的行
//! - 把 markdown 图片引用替换为视觉模型生成的文字描述
//!
//! PDF 提取只得到文本层，其中的图表不会生成描述

use futures::future::try_join_all;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, DocumentError};
use crate::services::llm_service::ReviewModel;

pub const OCR_START_MARKER: &str = "<<< OCR IMAGE DESCRIPTION START >>>";
pub const OCR_END_MARKER: &str = "<<< OCR IMAGE DESCRIPTION END >>>";

/// 文档加载器
pub struct DocumentLoader {
    /// 为 None 时直接删除图片引用
    describer: Option<Arc<dyn ReviewModel>>,
    /// 与章节评审共用的请求并发许可
    semaphore: Arc<Semaphore>,
    page_number: Regex,
    image_ref: Regex,
}

impl DocumentLoader {
    /// 创建文档加载器
    ///
    /// # 参数
    /// - `describer`: 用于描述图片的模型，None 表示不描述图片
    /// - `semaphore`: 全局请求并发许可，每次图片描述占用一个
    pub fn new(
        describer: Option<Arc<dyn ReviewModel>>,
        semaphore: Arc<Semaphore>,
    ) -> AppResult<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern).map_err(|source| DocumentError::Pattern {
                name: name.to_string(),
                source,
            })
        };

        Ok(Self {
            describer,
            semaphore,
            page_number: compile("page_number", r"(?m)^[ \t]*\d{1,4}[ \t]*(?:\n|\z)")?,
            image_ref: compile("image_ref", r"!\[[^\]]*\]\(\s*([^)\s]+)\s*\)")?,
        })
    }

    /// 加载并清洗文档
    pub async fn load(&self, path: &Path) -> AppResult<String> {
        let path_str = path.display().to_string();

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(AppError::file_not_found(path_str));
        }

        let raw = if is_pdf(path) {
            info!("📖 正在提取 PDF 文本: {}", path_str);
            if self.describer.is_some() {
                warn!("⚠️ PDF 中的图片不会生成描述，只评审文本层");
            }
            extract_pdf_text(path.to_path_buf()).await?
        } else {
            info!("📖 正在读取文本文件: {}", path_str);
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::file_read_failed(&path_str, e))?
        };

        let cleaned = self.clean(&raw);
        let text = self.replace_images(&cleaned).await?;

        debug!("文档加载完成: {} 字符", text.chars().count());
        Ok(text)
    }

    /// 统一换行并删除页码行
    pub fn clean(&self, raw: &str) -> String {
        let normalized = raw.replace("\r\n", "\n");
        self.page_number.replace_all(&normalized, "").into_owned()
    }

    /// 把图片引用替换为 OCR 描述块
    pub async fn replace_images(&self, text: &str) -> AppResult<String> {
        let urls: Vec<&str> = self
            .image_ref
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
            .collect();

        if urls.is_empty() {
            return Ok(text.to_string());
        }

        let descriptions = match &self.describer {
            Some(model) => {
                info!("🖼️ 正在描述 {} 张图片...", urls.len());
                let descriptions = try_join_all(urls.iter().map(|url| async move {
                    let _permit = self.semaphore.acquire().await?;
                    model.describe_image(url).await
                }))
                .await?;
                Some(descriptions)
            }
            None => {
                debug!("未启用图片描述，删除 {} 处图片引用", urls.len());
                None
            }
        };

        let mut result = String::with_capacity(text.len());
        let mut last_end = 0;
        for (i, m) in self.image_ref.find_iter(text).enumerate() {
            result.push_str(&text[last_end..m.start()]);
            if let Some(descriptions) = &descriptions {
                result.push_str(&ocr_block(&descriptions[i]));
            }
            last_end = m.end();
        }
        result.push_str(&text[last_end..]);

        Ok(result)
    }
}

/// OCR 描述块
pub fn ocr_block(description: &str) -> String {
    format!(
        "{}\n{}\n{}\n",
        OCR_START_MARKER,
        description.trim(),
        OCR_END_MARKER
    )
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

async fn extract_pdf_text(path: PathBuf) -> AppResult<String> {
    let path_str = path.display().to_string();
    // pdf-extract 是同步解析，放到阻塞线程
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path)).await?;

    extracted.map_err(|e| {
        DocumentError::PdfExtract {
            path: path_str,
            message: e.to_string(),
        }
        .into()
    })
}
