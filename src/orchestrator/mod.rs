//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次评审运行的调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! review_runner (处理整份文档 → Vec<Section>)
//!     ↓
//! workflow::SectionFlow (处理单个章节)
//!     ↓
//! services (能力层：loader / extractor / llm / formatter / writer)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：只做调度、失败策略和统计，不做具体业务判断
//! 2. **资源隔离**：只有编排层持有模型客户端
//! 3. **向下依赖**：编排层 → workflow → services

pub mod review_runner;

pub use review_runner::ReviewRunner;
