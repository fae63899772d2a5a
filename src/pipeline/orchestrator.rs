//! Pipeline orchestrator: normalize, extract, enrich, create, remember.
//!
//! Stages run strictly in order for one invocation. Invocations may overlap;
//! the session store serializes their writes.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{Instrument, Span, error, info, info_span, warn};
use uuid::Uuid;

use crate::agents::{Enricher, LlmEnricher, LlmExtractor, StructureExtractor, TaskRecord};
use crate::config::TaskflowConfig;
use crate::error::{Error, PipelineError};
use crate::intake::{InputNormalizer, create_transcriber};
use crate::llm::create_provider;
use crate::memory::{SessionSnapshot, SessionStore};
use crate::pipeline::types::ResultEnvelope;
use crate::tracker::{TaskCreator, VikunjaClient};

/// Recent tasks included in the enrichment context.
const CONTEXT_TASKS: usize = 5;

/// Reported when the tracker response has no id.
const NO_TASK_ID: i64 = -1;

/// Initialization state. `Failed` is retried on the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Ready,
    Failed(String),
}

/// Collaborators injected into the orchestrator.
pub struct PipelineDeps {
    pub normalizer: InputNormalizer,
    pub extractor: Arc<dyn StructureExtractor>,
    pub enricher: Arc<dyn Enricher>,
    pub tracker: Arc<dyn TaskCreator>,
    pub memory: Arc<SessionStore>,
}

pub struct Orchestrator {
    normalizer: InputNormalizer,
    extractor: Arc<dyn StructureExtractor>,
    enricher: Arc<dyn Enricher>,
    tracker: Arc<dyn TaskCreator>,
    memory: Arc<SessionStore>,
    init: Mutex<InitState>,
}

impl Orchestrator {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            normalizer: deps.normalizer,
            extractor: deps.extractor,
            enricher: deps.enricher,
            tracker: deps.tracker,
            memory: deps.memory,
            init: Mutex::new(InitState::Uninitialized),
        }
    }

    /// Wire the production collaborators: LLM-backed stages, the configured
    /// transcriber and a Vikunja tracker.
    pub fn from_config(config: &TaskflowConfig) -> Result<Self, Error> {
        let llm = create_provider(&config.llm)?;
        let transcriber = create_transcriber(&config.voice)?;

        Ok(Self::new(PipelineDeps {
            normalizer: InputNormalizer::new(transcriber),
            extractor: Arc::new(LlmExtractor::new(llm.clone())),
            enricher: Arc::new(LlmEnricher::new(llm)),
            tracker: Arc::new(VikunjaClient::new(config.tracker.clone())),
            memory: Arc::new(SessionStore::new(config.session.clone())),
        }))
    }

    pub async fn init_state(&self) -> InitState {
        self.init.lock().await.clone()
    }

    /// Check the tracker connection. A no-op once successful.
    ///
    /// An unreachable tracker is tolerated (tasks fail per request);
    /// configuration errors are returned and leave the orchestrator retryable.
    pub async fn initialize(&self) -> Result<(), Error> {
        let mut state = self.init.lock().await;
        if *state == InitState::Ready {
            return Ok(());
        }

        match self.tracker.connect().await {
            Ok(true) => {
                info!("Orchestrator initialized");
                *state = InitState::Ready;
                Ok(())
            }
            Ok(false) => {
                warn!("Task tracker unavailable, continuing in demo mode");
                *state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Orchestrator initialization failed");
                *state = InitState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Run one input through the pipeline.
    ///
    /// Only an initialization failure is returned as `Err`; stage failures
    /// become a `success: false` envelope.
    pub async fn process_input(&self, raw: &str, hint: &str) -> Result<ResultEnvelope, Error> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "process_input",
            %request_id,
            hint,
            channel = tracing::field::Empty
        );

        self.process_in_span(raw, hint).instrument(span).await
    }

    async fn process_in_span(&self, raw: &str, hint: &str) -> Result<ResultEnvelope, Error> {
        self.initialize().await?;

        match self.run_stages(raw, hint).await {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                error!(error = %e, "Pipeline failed");
                Ok(ResultEnvelope::failed(e.to_string(), hint))
            }
        }
    }

    /// Like [`Self::process_input`], for structured input. Strings are used
    /// verbatim; anything else is passed as compact JSON.
    pub async fn process_value(&self, raw: &Value, hint: &str) -> Result<ResultEnvelope, Error> {
        let text = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.process_input(&text, hint).await
    }

    async fn run_stages(&self, raw: &str, hint: &str) -> Result<ResultEnvelope, PipelineError> {
        let input = self.normalizer.normalize(raw, hint).await?;
        Span::current().record("channel", input.channel.as_str());

        self.memory.add_interaction(hint, &input.text, input.channel);

        let extracted = self.extractor.extract(&input.text).await;
        let task = TaskRecord::from_patch(extracted, &input.text);

        let context = format!(
            "{}\nUser patterns: {}",
            self.memory.get_context(CONTEXT_TASKS),
            self.memory.get_user_patterns()
        );
        let patch = self.enricher.enrich(&task, &context).await;
        let task = task.merged(patch);

        let created = self.tracker.create_task(&task, input.channel).await?;
        let task_id = created.id.unwrap_or(NO_TASK_ID);

        self.memory.add_task_created(
            task_id,
            &task.title,
            input.channel,
            task.priority,
            &task.labels,
        );

        info!(
            task_id,
            title = %task.title,
            priority = task.priority,
            "Task pipeline complete"
        );
        Ok(ResultEnvelope::created(task_id, &task, input.channel))
    }

    pub fn get_memory_context(&self) -> SessionSnapshot {
        self.memory.snapshot()
    }

    pub async fn cleanup(&self) {
        self.tracker.close().await;
        info!("Orchestrator cleaned up");
    }
}
