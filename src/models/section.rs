//! 章节模型
//!
//! 开题报告的八个标准章节，以及抽取结果的容器

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 章节名称
///
/// 声明顺序即规范顺序，`Ord` 依赖这一点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionName {
    Abstract,
    Introduction,
    Problem,
    Motivation,
    Objective,
    Schedule,
    Bibliography,
    Transparency,
}

impl SectionName {
    /// 全部章节（规范顺序）
    pub const ALL: [SectionName; 8] = [
        SectionName::Abstract,
        SectionName::Introduction,
        SectionName::Problem,
        SectionName::Motivation,
        SectionName::Objective,
        SectionName::Schedule,
        SectionName::Bibliography,
        SectionName::Transparency,
    ];

    /// 小写键名（用于 JSON 与提示词查找）
    pub fn key(self) -> &'static str {
        match self {
            SectionName::Abstract => "abstract",
            SectionName::Introduction => "introduction",
            SectionName::Problem => "problem",
            SectionName::Motivation => "motivation",
            SectionName::Objective => "objective",
            SectionName::Schedule => "schedule",
            SectionName::Bibliography => "bibliography",
            SectionName::Transparency => "transparency",
        }
    }

    /// 首字母大写的显示名称
    pub fn display_name(self) -> &'static str {
        match self {
            SectionName::Abstract => "Abstract",
            SectionName::Introduction => "Introduction",
            SectionName::Problem => "Problem",
            SectionName::Motivation => "Motivation",
            SectionName::Objective => "Objective",
            SectionName::Schedule => "Schedule",
            SectionName::Bibliography => "Bibliography",
            SectionName::Transparency => "Transparency",
        }
    }

    /// 规范顺序中的位置
    pub fn canonical_index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        SectionName::ALL
            .into_iter()
            .find(|name| name.key() == lowered)
            .ok_or_else(|| format!("未知章节: {}", s))
    }
}

/// 单个章节在全文中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub name: SectionName,
    /// 标题起始偏移
    pub heading_start: usize,
    /// 正文起始偏移（标题行之后）
    pub content_start: usize,
    /// 正文结束偏移（下一个标题或全文末尾）
    pub end: usize,
}

/// 章节抽取结果
///
/// 八个章节始终都在，未找到标题的章节内容为空字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    contents: BTreeMap<SectionName, String>,
    spans: Vec<SectionSpan>,
}

impl Sections {
    pub(crate) fn new(contents: BTreeMap<SectionName, String>, spans: Vec<SectionSpan>) -> Self {
        Self { contents, spans }
    }

    /// 获取章节内容
    pub fn get(&self, name: SectionName) -> &str {
        self.contents.get(&name).map(String::as_str).unwrap_or("")
    }

    /// 按规范顺序遍历所有章节
    pub fn iter(&self) -> impl Iterator<Item = (SectionName, &str)> {
        SectionName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    /// 按标题位置排序的已找到章节
    pub fn spans(&self) -> &[SectionSpan] {
        &self.spans
    }

    /// 非空章节数量
    pub fn non_empty_count(&self) -> usize {
        self.iter().filter(|(_, text)| !text.trim().is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let mut names = vec![
            SectionName::Transparency,
            SectionName::Abstract,
            SectionName::Schedule,
            SectionName::Problem,
        ];
        names.sort();
        assert_eq!(
            names,
            vec![
                SectionName::Abstract,
                SectionName::Problem,
                SectionName::Schedule,
                SectionName::Transparency,
            ]
        );
        assert_eq!(SectionName::Transparency.canonical_index(), 7);
    }

    #[test]
    fn test_parse_section_name() {
        assert_eq!("Abstract".parse::<SectionName>(), Ok(SectionName::Abstract));
        assert_eq!(" OBJECTIVE ".parse::<SectionName>(), Ok(SectionName::Objective));
        assert!("conclusion".parse::<SectionName>().is_err());
    }

    #[test]
    fn test_serde_lowercase_key() {
        let json = serde_json::to_string(&SectionName::Bibliography).unwrap();
        assert_eq!(json, "\"bibliography\"");
    }
}
