pub mod feedback;
pub mod report;
pub mod section;

pub use feedback::{FeedbackIssue, FeedbackIssueList, FeedbackKind, Priority};
pub use report::{FlatIssue, Report, ReviewOutcome, SectionFailure, SectionFeedback};
pub use section::{SectionName, SectionSpan, Sections};
