//! 报告格式化服务 - 业务能力层
//!
//! 把聚合后的 `Report` 渲染为 markdown、纯文本和变更请求列表。
//! 所有输出都是确定性的：章节按规范顺序，章节内按优先级从高到低。

use std::fmt::Write;

use crate::error::{AppResult, ReportError};
use crate::models::{FeedbackIssue, FeedbackKind, Priority, Report, SectionName};

const NO_ISSUES: &str = "No issues found.";

/// 章节内按优先级分桶，桶内保持原顺序
fn priority_buckets(
    report: &Report,
    section: SectionName,
) -> Vec<(Priority, Vec<(&FeedbackIssue, FeedbackKind)>)> {
    let Some(feedback) = report.get(section) else {
        return Vec::new();
    };

    let tagged: Vec<(&FeedbackIssue, FeedbackKind)> = feedback
        .content_issues
        .iter()
        .map(|issue| (issue, FeedbackKind::Content))
        .chain(
            feedback
                .writing_issues
                .iter()
                .map(|issue| (issue, FeedbackKind::Writing)),
        )
        .collect();

    Priority::DESCENDING
        .into_iter()
        .filter_map(|priority| {
            let bucket: Vec<_> = tagged
                .iter()
                .copied()
                .filter(|(issue, _)| issue.priority == priority)
                .collect();
            (!bucket.is_empty()).then_some((priority, bucket))
        })
        .collect()
}

/// 渲染 markdown 报告
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::from("# Proposal Review\n\n");

    if report.total_issues() == 0 {
        out.push_str(NO_ISSUES);
        out.push('\n');
        return out;
    }

    for (section, feedback) in report.sections() {
        if feedback.issue_count() == 0 {
            continue;
        }
        let _ = writeln!(out, "## {}\n", section.display_name());

        for (priority, issues) in priority_buckets(report, section) {
            let _ = writeln!(out, "### {} {} Priority\n", priority.icon(), priority.label());

            for (issue, kind) in issues {
                let _ = writeln!(out, "- **{}** ({}): {}", issue.category, kind, issue.issue);
                if let Some(quote) = &issue.quote {
                    let _ = writeln!(out, "  - Quote: \"{}\"", quote);
                }
                let _ = writeln!(out, "  - Suggestion: {}", issue.suggestion);
                if let Some(rule) = &issue.rule {
                    let _ = writeln!(out, "  - Rule: {}", rule);
                }
            }
            out.push('\n');
        }
    }

    out
}

/// 渲染纯文本报告，用文字标记代替图标
pub fn render_plain_text(report: &Report) -> String {
    let title = "PROPOSAL REVIEW";
    let mut out = format!("{}\n{}\n\n", title, "=".repeat(title.len()));

    if report.total_issues() == 0 {
        out.push_str(NO_ISSUES);
        out.push('\n');
        return out;
    }

    for (section, feedback) in report.sections() {
        if feedback.issue_count() == 0 {
            continue;
        }
        let heading = section.display_name().to_uppercase();
        let _ = writeln!(out, "{}\n{}", heading, "-".repeat(heading.len()));

        for (priority, issues) in priority_buckets(report, section) {
            for (issue, kind) in issues {
                let _ = writeln!(
                    out,
                    "{} {} ({}): {}",
                    priority.text_marker(),
                    issue.category,
                    kind,
                    issue.issue
                );
                if let Some(quote) = &issue.quote {
                    let _ = writeln!(out, "    Quote: \"{}\"", quote);
                }
                let _ = writeln!(out, "    Suggestion: {}", issue.suggestion);
                if let Some(rule) = &issue.rule {
                    let _ = writeln!(out, "    Rule: {}", rule);
                }
            }
        }
        out.push('\n');
    }

    out
}

/// 格式化一条变更请求
///
/// `<Section> > [<priority>] <rule> - "<quote>" - <issue> -> <suggestion>`，
/// rule 与 quote 缺失时省略对应片段。各字段内的换行和连续空白压成一个空格，保证一条一行
pub fn format_change_request(section: SectionName, issue: &FeedbackIssue) -> String {
    let mut line = format!("{} > [{}]", section.display_name(), issue.priority);
    if let Some(rule) = &issue.rule {
        let _ = write!(line, " {} -", single_line(rule));
    }
    if let Some(quote) = &issue.quote {
        let _ = write!(line, " \"{}\" -", single_line(quote));
    }
    let _ = write!(
        line,
        " {} -> {}",
        single_line(&issue.issue),
        single_line(&issue.suggestion)
    );
    line
}

/// 把任意空白序列压成单个空格
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 生成全部变更请求（已排序）
pub fn change_requests(report: &Report) -> AppResult<Vec<String>> {
    let lines = report
        .sections()
        .flat_map(|(section, feedback)| {
            feedback
                .content_issues
                .iter()
                .chain(feedback.writing_issues.iter())
                .map(move |issue| format_change_request(section, issue))
        })
        .collect();

    sort_change_requests(lines)
}

/// 按规范章节顺序稳定排序变更请求
///
/// 章节标签取 ` > ` 之前的文本；无法识别的标签返回 `ReportError::UnknownSection`
pub fn sort_change_requests(lines: Vec<String>) -> AppResult<Vec<String>> {
    let mut keyed = lines
        .into_iter()
        .map(|line| {
            let label = line.split(" > ").next().unwrap_or_default();
            let section: SectionName =
                label
                    .parse()
                    .map_err(|_| ReportError::UnknownSection {
                        label: label.to_string(),
                    })?;
            Ok::<_, ReportError>((section.canonical_index(), line))
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    keyed.sort_by_key(|(index, _)| *index);
    Ok(keyed.into_iter().map(|(_, line)| line).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::SectionFeedback;

    fn issue(section: SectionName, priority: Priority, text: &str) -> FeedbackIssue {
        FeedbackIssue {
            section: Some(section),
            category: "Clarity".to_string(),
            priority,
            quote: None,
            issue: text.to_string(),
            suggestion: format!("rewrite {}", text),
            rule: None,
        }
    }

    fn mixed_report() -> Report {
        let mut with_quote = issue(SectionName::Problem, Priority::VeryHigh, "vague claim");
        with_quote.quote = Some("it is well known".to_string());
        with_quote.rule = Some("Cite sources".to_string());

        Report::from_sections([
            (
                SectionName::Problem,
                SectionFeedback {
                    content_issues: vec![
                        issue(SectionName::Problem, Priority::Low, "minor gap"),
                        with_quote,
                    ],
                    writing_issues: vec![issue(SectionName::Problem, Priority::Low, "typo")],
                },
            ),
            (
                SectionName::Abstract,
                SectionFeedback {
                    content_issues: vec![issue(SectionName::Abstract, Priority::Medium, "too long")],
                    writing_issues: vec![],
                },
            ),
            (SectionName::Schedule, SectionFeedback::default()),
        ])
    }

    #[test]
    fn test_change_request_format() {
        let mut full = issue(SectionName::Problem, Priority::High, "Unclear scope");
        full.quote = Some("we study everything".to_string());
        full.rule = Some("Be specific".to_string());
        assert_eq!(
            format_change_request(SectionName::Problem, &full),
            "Problem > [High] Be specific - \"we study everything\" - Unclear scope -> rewrite Unclear scope"
        );

        let bare = issue(SectionName::Abstract, Priority::VeryLow, "Passive voice");
        assert_eq!(
            format_change_request(SectionName::Abstract, &bare),
            "Abstract > [Very Low] Passive voice -> rewrite Passive voice"
        );
    }

    #[test]
    fn test_change_request_stays_on_one_line() {
        let mut multi = issue(SectionName::Schedule, Priority::Medium, "Missing\nmilestones");
        multi.quote = Some("Month 1: read.\r\nMonth 2:   write.".to_string());
        multi.suggestion = "Add dates\n\nfor each phase".to_string();

        let line = format_change_request(SectionName::Schedule, &multi);
        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert_eq!(
            line,
            "Schedule > [Medium] \"Month 1: read. Month 2: write.\" - Missing milestones -> Add dates for each phase"
        );

        let report = Report::from_sections([(
            SectionName::Schedule,
            SectionFeedback {
                content_issues: vec![multi],
                writing_issues: Vec::new(),
            },
        )]);
        assert_eq!(change_requests(&report).unwrap().len(), 1);
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("  a \t b\n\nc  "), "a b c");
        assert_eq!(single_line(""), "");
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let report = mixed_report();
        assert_eq!(render_markdown(&report), render_markdown(&report));
        assert_eq!(render_plain_text(&report), render_plain_text(&report));
        assert_eq!(
            change_requests(&report).unwrap(),
            change_requests(&report).unwrap()
        );
    }

    #[test]
    fn test_sort_change_requests_across_all_sections() {
        let canonical: Vec<String> = SectionName::ALL
            .iter()
            .map(|name| format!("{} > [High] issue -> fix", name.display_name()))
            .collect();

        let mut shuffled = canonical.clone();
        shuffled.reverse();
        shuffled.swap(1, 5);
        shuffled.swap(0, 3);

        assert_eq!(sort_change_requests(shuffled).unwrap(), canonical);
    }

    #[test]
    fn test_sort_change_requests_is_stable() {
        let lines = vec![
            "Problem > [Low] b -> b".to_string(),
            "Abstract > [High] a -> a".to_string(),
            "Problem > [High] c -> c".to_string(),
        ];
        assert_eq!(
            sort_change_requests(lines).unwrap(),
            vec![
                "Abstract > [High] a -> a",
                "Problem > [Low] b -> b",
                "Problem > [High] c -> c",
            ]
        );
    }

    #[test]
    fn test_sort_change_requests_unknown_section() {
        let lines = vec![
            "Abstract > [High] a -> a".to_string(),
            "Appendix > [Low] b -> b".to_string(),
        ];
        let err = sort_change_requests(lines).unwrap_err();
        assert!(matches!(
            err,
            AppError::Report(ReportError::UnknownSection { ref label }) if label == "Appendix"
        ));
    }

    #[test]
    fn test_markdown_priority_buckets() {
        let markdown = render_markdown(&mixed_report());

        assert!(markdown.starts_with("# Proposal Review\n"));
        // 空章节不输出标题
        assert!(!markdown.contains("## Schedule"));

        let abstract_pos = markdown.find("## Abstract").unwrap();
        let problem_pos = markdown.find("## Problem").unwrap();
        assert!(abstract_pos < problem_pos);

        let very_high = markdown.find("### 🔴 Very High Priority").unwrap();
        let low = markdown.find("### 🟢 Low Priority").unwrap();
        assert!(problem_pos < very_high && very_high < low);
        assert_eq!(markdown.matches("### 🟢 Low Priority").count(), 1);

        assert!(markdown.contains("- **Clarity** (content): vague claim"));
        assert!(markdown.contains("  - Quote: \"it is well known\""));
        assert!(markdown.contains("  - Rule: Cite sources"));
        assert!(markdown.contains("- **Clarity** (writing): typo"));
    }

    #[test]
    fn test_plain_text_markers() {
        let text = render_plain_text(&mixed_report());

        assert!(text.contains("PROBLEM\n-------"));
        assert!(text.contains("[VERY HIGH] Clarity (content): vague claim"));
        assert!(text.contains("[LOW] Clarity (writing): typo"));
        assert!(text.contains("[MEDIUM] Clarity (content): too long"));
        assert!(!text.contains("🔴"));
    }

    #[test]
    fn test_empty_report() {
        let report = Report::default();
        assert_eq!(render_markdown(&report), "# Proposal Review\n\nNo issues found.\n");
        assert!(render_plain_text(&report).ends_with("No issues found.\n"));
        assert!(change_requests(&report).unwrap().is_empty());
    }
}
