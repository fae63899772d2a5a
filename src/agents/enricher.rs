//! Enrichment: refine a task using session context.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::agents::types::{TaskPatch, TaskRecord};
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, extract_json_object};

const ENRICH_TEMPERATURE: f32 = 0.3;
const ENRICH_MAX_TOKENS: u32 = 500;

/// Proposes changes to a task given recent session context.
///
/// The returned patch is merged over the task, so an empty patch leaves it
/// unchanged. Implementations never fail.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, task: &TaskRecord, context: &str) -> TaskPatch;
}

/// LLM-backed enricher.
pub struct LlmEnricher {
    llm: Arc<dyn LlmProvider>,
}

impl LlmEnricher {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn try_enrich(&self, task: &TaskRecord, context: &str) -> Result<TaskPatch, LlmError> {
        let task_json = serde_json::to_string_pretty(task)?;
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(&task_json, context)),
        ])
        .with_temperature(ENRICH_TEMPERATURE)
        .with_max_tokens(ENRICH_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let patch = serde_json::from_str(&extract_json_object(&response.content))?;
        Ok(patch)
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn enrich(&self, task: &TaskRecord, context: &str) -> TaskPatch {
        info!(title = %task.title, "Enriching task");

        match self.try_enrich(task, context).await {
            Ok(patch) => {
                if let Some(priority) = patch.priority {
                    info!(priority, "Enriched task priority");
                }
                patch
            }
            Err(e) => {
                warn!(error = %e, "Enrichment failed, keeping task unchanged");
                TaskPatch::default()
            }
        }
    }
}

const SYSTEM_PROMPT: &str = "You improve task records. \
Respond with ONLY a JSON object using the same fields as the input task.";

fn build_user_prompt(task_json: &str, context: &str) -> String {
    format!(
        "Improve this task using the provided context:

Task:
{task_json}

Context:
{context}

Rules:
1. If task seems urgent (keywords: critical, blocker, ASAP), increase priority
2. Suggest relevant labels based on the task
3. Fill missing due_date if context suggests timing
4. Keep title concise

Return ONLY JSON with the same structure, enhanced fields:"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::llm::CompletionResponse;

    struct StubLlm {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.prompts.lock().unwrap().push(request.prompt());
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: "timeout".into(),
                }),
            }
        }
    }

    fn stub(reply: Result<&str, ()>) -> Arc<StubLlm> {
        Arc::new(StubLlm {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn task() -> TaskRecord {
        TaskRecord {
            title: "Fix login bug".into(),
            description: "Fix the login bug by Friday, it's critical".into(),
            priority: 2,
            due_date: None,
            labels: vec!["bug".into()],
        }
    }

    #[tokio::test]
    async fn partial_patch_only_touches_present_fields() {
        let llm = stub(Ok(r#"{"priority": 3, "labels": ["bug", "urgent"]}"#));
        let patch = LlmEnricher::new(llm).enrich(&task(), "ctx").await;
        let merged = task().merged(patch);
        assert_eq!(merged.priority, 3);
        assert_eq!(merged.labels, vec!["bug".to_string(), "urgent".to_string()]);
        assert_eq!(merged.title, "Fix login bug");
    }

    #[tokio::test]
    async fn prompt_carries_task_and_context() {
        let llm = stub(Ok("{}"));
        LlmEnricher::new(llm.clone())
            .enrich(&task(), "Recent tasks created:\n- Earlier (Priority: 1, Labels: )\n")
            .await;
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"title\": \"Fix login bug\""));
        assert!(prompts[0].contains("- Earlier (Priority: 1, Labels: )"));
        assert!(prompts[0].contains("critical, blocker, ASAP"));
    }

    #[tokio::test]
    async fn failure_leaves_task_unchanged() {
        let patch = LlmEnricher::new(stub(Err(()))).enrich(&task(), "").await;
        assert!(patch.is_empty());
        assert_eq!(task().merged(patch), task());
    }

    #[tokio::test]
    async fn unparseable_reply_leaves_task_unchanged() {
        let patch = LlmEnricher::new(stub(Ok("sure thing!"))).enrich(&task(), "").await;
        assert!(patch.is_empty());
    }
}
