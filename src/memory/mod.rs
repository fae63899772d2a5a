//! Session memory supplying context to enrichment.

pub mod session;

pub use session::{
    Interaction, SessionConfig, SessionSnapshot, SessionStore, TaskMemory, UserPatterns,
};
