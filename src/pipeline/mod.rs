//! Task pipeline.
//!
//! Every input flows through:
//! 1. `InputNormalizer::normalize()`: channel resolution and normalization
//! 2. `StructureExtractor::extract()`: text to task record
//! 3. `Enricher::enrich()`: refinement using session context
//! 4. `TaskCreator::create_task()`: persistence to the tracker
//!
//! The outcome is recorded in the session store and returned as a
//! `ResultEnvelope`.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{InitState, Orchestrator, PipelineDeps};
pub use types::ResultEnvelope;
