//! 提示词注册表 - 业务能力层
//!
//! 章节名 → 评审提示词模板。模板文本放在仓库根目录的 `prompts/` 下，编译期嵌入。

use std::borrow::Cow;

use crate::models::SectionName;

/// 通用写作质量伪章节
pub const WRITING_QUALITY: &str = "writing_quality";
/// 图表伪章节
pub const DIAGRAMS_FIGURES: &str = "diagrams_figures";

static PROMPTS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "abstract" => include_str!("../../prompts/abstract.md"),
    "introduction" => include_str!("../../prompts/introduction.md"),
    "problem" => include_str!("../../prompts/problem.md"),
    "motivation" => include_str!("../../prompts/motivation.md"),
    "objective" => include_str!("../../prompts/objective.md"),
    "schedule" => include_str!("../../prompts/schedule.md"),
    "bibliography" => include_str!("../../prompts/bibliography.md"),
    "transparency" => include_str!("../../prompts/transparency.md"),
    "writing_quality" => include_str!("../../prompts/writing_quality.md"),
    "diagrams_figures" => include_str!("../../prompts/diagrams_figures.md"),
};

/// 按名称查找提示词（忽略大小写），未知名称返回通用模板
pub fn lookup(name: &str) -> Cow<'static, str> {
    match PROMPTS.get(name.trim().to_lowercase().as_str()) {
        Some(prompt) => Cow::Borrowed(prompt),
        None => Cow::Owned(format!(
            "Review the following {} section and provide detailed feedback.",
            name
        )),
    }
}

/// 章节专用提示词
pub fn section_prompt(section: SectionName) -> &'static str {
    PROMPTS.get(section.key()).copied().unwrap_or_default()
}

/// 通用写作质量提示词
pub fn writing_prompt() -> &'static str {
    PROMPTS.get(WRITING_QUALITY).copied().unwrap_or_default()
}

/// 已注册的全部名称
pub fn names() -> impl Iterator<Item = &'static str> {
    PROMPTS.keys().copied()
}
