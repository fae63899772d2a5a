//! TaskFlow: turns free text, email and voice input into tracker tasks.

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod pipeline;
pub mod tracker;
