//! Model access for the extraction and enrichment stages.
//!
//! Stages talk to [`LlmProvider`]; `create_provider` picks a rig-core client
//! for the configured backend and wraps its completion model in [`RigAdapter`].

mod json;
pub mod provider;
mod rig_adapter;

pub use json::extract_json_object;
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::fmt;
use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::error::LlmError;

/// Hosted model vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
}

fn client_error(backend: LlmBackend, err: impl fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: backend.as_str().to_string(),
        reason: format!("client construction failed: {err}"),
    }
}

/// Build the provider shared by both model-backed stages.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let key = config.api_key.expose_secret();
    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            use rig::providers::anthropic;
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error(config.backend, e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
        LlmBackend::OpenAi => {
            use rig::providers::openai;
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error(config.backend, e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
    };

    info!(backend = config.backend.as_str(), model = %config.model, "LLM provider ready");
    Ok(provider)
}
