//! LLM-backed pipeline stages: structure extraction and enrichment.

pub mod enricher;
pub mod extractor;
pub mod types;

pub use enricher::{Enricher, LlmEnricher};
pub use extractor::{LlmExtractor, StructureExtractor};
pub use types::{TaskPatch, TaskRecord};
