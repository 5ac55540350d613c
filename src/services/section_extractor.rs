//! 章节抽取服务 - 业务能力层
//!
//! 只负责"把全文切成章节"能力，不关心 LLM 和输出
//!
//! ## 规则
//! - 每个章节对应一个标题正则（忽略大小写，允许前置编号和 markdown 标记）
//! - 同一标题出现多次时取最后一次（目录中的条目通常在前）
//! - 正文从标题所在行的下一行开始，到下一个标题为止
//! - 找不到标题的章节内容为空，不报错

use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{AppResult, DocumentError};
use crate::models::{SectionName, SectionSpan, Sections};

/// 标题前缀：行首空白、可选的 `#` 标记、可选的加粗、可选的编号（1 / 1. / 2.1）
const HEADING_PREFIX: &str = r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*)?(?:\d+(?:\.\d+)*\.?[ \t]*)?";

fn heading_keywords(section: SectionName) -> &'static str {
    match section {
        SectionName::Abstract => "abstract|summary",
        SectionName::Introduction => "introduction",
        SectionName::Problem => "problem statement|research problem|problem",
        SectionName::Motivation => "motivation|relevance",
        SectionName::Objective => "research objectives?|objectives?|goals|aims",
        SectionName::Schedule => "schedule|timeline|work plan",
        SectionName::Bibliography => "bibliography|references|works cited",
        SectionName::Transparency => "transparency|ethical considerations|ethics",
    }
}

/// 章节抽取器
pub struct SectionExtractor {
    patterns: Vec<(SectionName, Regex)>,
}

impl SectionExtractor {
    /// 编译所有章节的标题正则
    pub fn new() -> AppResult<Self> {
        let patterns = SectionName::ALL
            .into_iter()
            .map(|section| {
                let pattern = format!(r"{}(?:{})\b", HEADING_PREFIX, heading_keywords(section));
                Regex::new(&pattern)
                    .map(|re| (section, re))
                    .map_err(|e| DocumentError::Pattern {
                        name: section.to_string(),
                        source: e,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// 定位每个章节标题（取最后一次匹配），按位置升序
    fn locate_headings(&self, text: &str) -> Vec<(SectionName, usize)> {
        let mut headings: Vec<(SectionName, usize)> = self
            .patterns
            .iter()
            .filter_map(|(section, re)| re.find_iter(text).last().map(|m| (*section, m.start())))
            .collect();

        // 稳定排序：同一位置的标题保持规范顺序，后者占有正文
        headings.sort_by_key(|(_, pos)| *pos);
        headings
    }

    /// 把全文切分为八个章节
    pub fn extract(&self, text: &str) -> Sections {
        let headings = self.locate_headings(text);

        let mut contents: BTreeMap<SectionName, String> = SectionName::ALL
            .into_iter()
            .map(|section| (section, String::new()))
            .collect();
        let mut spans = Vec::with_capacity(headings.len());

        for (i, (section, heading_start)) in headings.iter().copied().enumerate() {
            let end = headings
                .get(i + 1)
                .map(|(_, next)| *next)
                .unwrap_or(text.len());

            let heading_end = text[heading_start..]
                .find('\n')
                .map(|offset| heading_start + offset + 1)
                .unwrap_or(text.len());
            // 标题与下一个标题在同一行时，本章节为空
            let content_start = heading_end.min(end);

            contents.insert(section, text[content_start..end].trim().to_string());
            spans.push(SectionSpan {
                name: section,
                heading_start,
                content_start,
                end,
            });
        }

        debug!(
            "章节抽取完成: 找到 {} / {} 个标题",
            spans.len(),
            SectionName::ALL.len()
        );

        Sections::new(contents, spans)
    }
}
