//! 章节处理上下文
//!
//! 封装"我正在评审第几个章节"这一信息

use std::fmt::Display;

use crate::models::SectionName;

/// 章节处理上下文
#[derive(Debug, Clone, Copy)]
pub struct SectionCtx {
    /// 章节名称
    pub section: SectionName,

    /// 本次评审中的序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本次评审的章节总数
    pub total: usize,
}

impl SectionCtx {
    pub fn new(section: SectionName, index: usize, total: usize) -> Self {
        Self {
            section,
            index,
            total,
        }
    }
}

impl Display for SectionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[章节 {}/{} {}]",
            self.index,
            self.total,
            self.section.display_name()
        )
    }
}
