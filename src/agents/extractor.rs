//! Structure extraction: natural-language text to a task record.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::agents::types::TaskPatch;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, extract_json_object};

const EXTRACT_TEMPERATURE: f32 = 0.2;
const EXTRACT_MAX_TOKENS: u32 = 500;

/// Turns free text into a (possibly partial) task record.
///
/// Implementations never fail: on any internal error they return a degraded
/// record built from the input text.
#[async_trait]
pub trait StructureExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> TaskPatch;
}

/// LLM-backed extractor.
pub struct LlmExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn try_extract(&self, text: &str) -> Result<TaskPatch, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(text)),
        ])
        .with_temperature(EXTRACT_TEMPERATURE)
        .with_max_tokens(EXTRACT_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        parse_extraction(&response.content, self.llm.model_name())
    }
}

#[async_trait]
impl StructureExtractor for LlmExtractor {
    async fn extract(&self, text: &str) -> TaskPatch {
        let preview: String = text.chars().take(80).collect();
        info!(text = %preview, "Extracting task structure");

        match self.try_extract(text).await {
            Ok(patch) => {
                info!(title = patch.title.as_deref().unwrap_or_default(), "Extracted task");
                patch
            }
            Err(e) => {
                warn!(error = %e, "Extraction failed, using degraded record");
                TaskPatch::degraded(text)
            }
        }
    }
}

const SYSTEM_PROMPT: &str = "You extract task information from text. \
Respond with ONLY a JSON object, no markdown and no extra text.";

fn build_user_prompt(text: &str) -> String {
    format!(
        r#"Extract task information from this text:

Text: {text}

Return ONLY a JSON object with these fields:
- title: Brief task title
- description: More detailed description
- priority: 0 (low) to 3 (urgent)
- due_date: YYYY-MM-DD or null
- labels: List of relevant tags

Example:
{{"title": "Fix login bug", "description": "Auth page broken", "priority": 2, "due_date": "2025-12-05", "labels": ["bug", "auth"]}}

Response:"#
    )
}

/// Parse the model output. A missing title or a non-integer priority is a
/// failure.
fn parse_extraction(raw: &str, provider: &str) -> Result<TaskPatch, LlmError> {
    let json = extract_json_object(raw);
    let patch: TaskPatch = serde_json::from_str(&json)?;
    if patch.title.is_none() {
        return Err(LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: "missing title".to_string(),
        });
    }
    Ok(patch)
}
