pub mod document_loader;
pub mod llm_service;
pub mod prompt_registry;
pub mod report_formatter;
pub mod report_writer;
pub mod section_extractor;

pub use document_loader::DocumentLoader;
pub use llm_service::{FeedbackRequest, LlmService, ReviewModel};
pub use report_writer::{OutputPaths, ReportWriter};
pub use section_extractor::SectionExtractor;
