pub mod document_flow;
pub mod section_ctx;
pub mod section_flow;

pub use document_flow::DocumentFlow;
pub use section_ctx::SectionCtx;
pub use section_flow::SectionFlow;
