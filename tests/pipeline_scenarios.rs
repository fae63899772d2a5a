//! End-to-end pipeline tests with stub collaborators.
//!
//! Most tests drive the orchestrator with hand-written stage stubs. The last
//! one wires the real LLM-backed stages and Vikunja client against a stub
//! model and a wiremock tracker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::SecretString;
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskflow::agents::{
    Enricher, LlmEnricher, LlmExtractor, StructureExtractor, TaskPatch, TaskRecord,
};
use taskflow::error::{Error, LlmError, TrackerError};
use taskflow::intake::{Channel, InputNormalizer, MockTranscriber};
use taskflow::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use taskflow::memory::{SessionConfig, SessionStore};
use taskflow::pipeline::{Orchestrator, PipelineDeps, ResultEnvelope};
use taskflow::tracker::{CreatedTask, TaskCreator, VikunjaClient, VikunjaConfig};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Stubs ───────────────────────────────────────────────────────────

struct FixedExtractor(TaskPatch);

#[async_trait]
impl StructureExtractor for FixedExtractor {
    async fn extract(&self, _text: &str) -> TaskPatch {
        self.0.clone()
    }
}

/// Returns a fixed patch and records every context string it sees.
struct RecordingEnricher {
    patch: TaskPatch,
    contexts: Mutex<Vec<String>>,
}

impl RecordingEnricher {
    fn new(patch: TaskPatch) -> Arc<Self> {
        Arc::new(Self {
            patch,
            contexts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Enricher for RecordingEnricher {
    async fn enrich(&self, _task: &TaskRecord, context: &str) -> TaskPatch {
        self.contexts.lock().unwrap().push(context.to_string());
        self.patch.clone()
    }
}

/// Records created tasks; fails every create when `fail` is set.
struct RecordingTracker {
    fail: bool,
    created: Mutex<Vec<(TaskRecord, Channel)>>,
}

impl RecordingTracker {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            created: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TaskCreator for RecordingTracker {
    async fn connect(&self) -> Result<bool, Error> {
        Ok(true)
    }

    async fn create_task(
        &self,
        task: &TaskRecord,
        source: Channel,
    ) -> Result<CreatedTask, TrackerError> {
        if self.fail {
            return Err(TrackerError::Backend {
                status: 500,
                body: "backend down".into(),
            });
        }
        let mut created = self.created.lock().unwrap();
        created.push((task.clone(), source));
        Ok(CreatedTask::from_response(&json!({"id": 41 + created.len() as i64})))
    }
}

struct Harness {
    orchestrator: Orchestrator,
    enricher: Arc<RecordingEnricher>,
    tracker: Arc<RecordingTracker>,
}

fn harness(extracted: TaskPatch, enriched: TaskPatch, fail: bool, max_items: usize) -> Harness {
    let enricher = RecordingEnricher::new(enriched);
    let tracker = RecordingTracker::new(fail);
    let orchestrator = Orchestrator::new(PipelineDeps {
        normalizer: InputNormalizer::new(Arc::new(MockTranscriber::new())),
        extractor: Arc::new(FixedExtractor(extracted)),
        enricher: enricher.clone(),
        tracker: tracker.clone(),
        memory: Arc::new(SessionStore::new(SessionConfig {
            ttl: Duration::ZERO,
            max_items,
        })),
    });
    Harness {
        orchestrator,
        enricher,
        tracker,
    }
}

fn login_bug_patch() -> TaskPatch {
    TaskPatch {
        title: Some("Fix login bug".into()),
        priority: Some(3),
        labels: Some(vec!["bug".into()]),
        ..Default::default()
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn text_input_creates_task() {
    let h = harness(login_bug_patch(), login_bug_patch(), false, 100);

    let envelope = timeout(
        TEST_TIMEOUT,
        h.orchestrator
            .process_input("Fix the login bug by Friday - it's critical", "text"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({
            "success": true,
            "task_id": 42,
            "title": "Fix login bug",
            "source": "text",
            "priority": 3,
            "labels": ["bug"]
        })
    );

    let snap = h.orchestrator.get_memory_context();
    assert_eq!(snap.created_tasks.len(), 1);
    assert_eq!(snap.created_tasks[0].task_id, 42);
    assert_eq!(snap.created_tasks[0].source, Channel::Text);
}

#[tokio::test]
async fn email_detected_despite_text_hint() {
    let h = harness(TaskPatch::default(), TaskPatch::default(), false, 100);

    let envelope = h
        .orchestrator
        .process_input("From: a@b.com\nSubject: X\n\nbody text", "text")
        .await
        .unwrap();

    assert_eq!(envelope.source(), "email");

    let snap = h.orchestrator.get_memory_context();
    assert_eq!(snap.interactions.len(), 1);
    assert_eq!(snap.interactions[0].kind, "text");
    assert_eq!(snap.interactions[0].channel, Channel::Email);
    assert_eq!(snap.interactions[0].content, "X. body text");

    let created = h.tracker.created.lock().unwrap();
    assert_eq!(created[0].1, Channel::Email);
    assert_eq!(created[0].0.title, "X. body text");
}

#[tokio::test]
async fn tracker_failure_returns_failed_envelope() {
    let h = harness(login_bug_patch(), TaskPatch::default(), true, 100);

    let envelope = h
        .orchestrator
        .process_input("Fix the login bug", "voice")
        .await
        .unwrap();

    match &envelope {
        ResultEnvelope::Failed { success, error, source } => {
            assert!(!success);
            assert!(error.contains("backend down"));
            // The original hint, not the resolved channel.
            assert_eq!(source, "voice");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let snap = h.orchestrator.get_memory_context();
    assert_eq!(snap.interactions.len(), 1);
    assert!(!snap.interactions[0].task_created);
    assert!(snap.created_tasks.is_empty());
}

#[tokio::test]
async fn malformed_email_fails_before_recording() {
    let h = harness(TaskPatch::default(), TaskPatch::default(), false, 100);

    let envelope = h.orchestrator.process_input("", "email").await.unwrap();

    assert!(!envelope.is_success());
    assert_eq!(envelope.source(), "email");
    assert!(envelope.error().unwrap().contains("Malformed email"));
    assert!(h.orchestrator.get_memory_context().interactions.is_empty());
}

#[tokio::test]
async fn failure_does_not_affect_next_invocation() {
    let h = harness(TaskPatch::default(), TaskPatch::default(), false, 100);

    assert!(
        !h.orchestrator
            .process_input("", "email")
            .await
            .unwrap()
            .is_success()
    );
    assert!(
        h.orchestrator
            .process_input("Buy milk", "text")
            .await
            .unwrap()
            .is_success()
    );
}

#[tokio::test]
async fn voice_input_uses_transcript_and_voice_source() {
    let h = harness(TaskPatch::default(), TaskPatch::default(), false, 100);

    let envelope = h
        .orchestrator
        .process_input("test_voice_1.wav", "voice")
        .await
        .unwrap();

    assert_eq!(envelope.source(), "voice");
    let created = h.tracker.created.lock().unwrap();
    assert_eq!(created[0].0.description, "Fix the login bug by Friday, it's critical");
    assert_eq!(created[0].1, Channel::Voice);
}

#[tokio::test]
async fn enrichment_sees_recent_tasks_and_patterns() {
    let h = harness(login_bug_patch(), TaskPatch::default(), false, 100);

    h.orchestrator.process_input("first", "text").await.unwrap();
    h.orchestrator.process_input("second", "text").await.unwrap();

    let contexts = h.enricher.contexts.lock().unwrap();
    assert_eq!(contexts[0], "Recent tasks created:\n\nUser patterns: {}");
    assert!(
        contexts[1].starts_with("Recent tasks created:\n- Fix login bug (Priority: 3, Labels: bug)\n")
    );
    assert!(contexts[1].contains("\"average_priority\":3.0"));
    assert!(contexts[1].contains("\"preferred_source\":\"text\""));
}

#[tokio::test]
async fn enrichment_overrides_only_present_fields() {
    let extracted = TaskPatch {
        title: Some("Ship release".into()),
        description: Some("Ship the 2.0 release".into()),
        due_date: Some(Some("2025-12-05".into())),
        labels: Some(vec!["release".into()]),
        ..Default::default()
    };
    let enriched: TaskPatch =
        serde_json::from_value(json!({"priority": 3, "due_date": null})).unwrap();
    let h = harness(extracted, enriched, false, 100);

    h.orchestrator.process_input("ship it ASAP", "text").await.unwrap();

    let created = h.tracker.created.lock().unwrap();
    let task = &created[0].0;
    assert_eq!(task.title, "Ship release");
    assert_eq!(task.description, "Ship the 2.0 release");
    assert_eq!(task.priority, 3);
    assert_eq!(task.due_date, None);
    assert_eq!(task.labels, vec!["release".to_string()]);
}

#[tokio::test]
async fn out_of_range_priority_is_clamped() {
    let patch = TaskPatch {
        priority: Some(7),
        ..Default::default()
    };
    let h = harness(patch, TaskPatch::default(), false, 100);

    let envelope = h.orchestrator.process_input("urgent", "text").await.unwrap();
    match envelope {
        ResultEnvelope::Created { priority, .. } => assert_eq!(priority, 3),
        other => panic!("unexpected envelope: {other:?}"),
    }
}

// ── Session properties ──────────────────────────────────────────────

#[tokio::test]
async fn session_keeps_most_recent_items() {
    let h = harness(TaskPatch::default(), TaskPatch::default(), false, 3);

    for i in 0..5 {
        h.orchestrator
            .process_input(&format!("task number {i}"), "text")
            .await
            .unwrap();
    }

    let snap = h.orchestrator.get_memory_context();
    let contents: Vec<&str> = snap.interactions.iter().map(|i| i.content.as_str()).collect();
    assert_eq!(contents, vec!["task number 2", "task number 3", "task number 4"]);
    assert_eq!(snap.created_tasks.len(), 3);
    assert_eq!(snap.patterns.total_tasks, 3);
}

#[tokio::test]
async fn concurrent_invocations_all_recorded() {
    let h = harness(TaskPatch::default(), TaskPatch::default(), false, 100);

    let inputs: Vec<String> = (0..20).map(|i| format!("parallel task {i}")).collect();
    let results = timeout(
        TEST_TIMEOUT,
        join_all(
            inputs
                .iter()
                .map(|input| h.orchestrator.process_input(input, "text")),
        ),
    )
    .await
    .unwrap();

    assert!(results.iter().all(|r| r.as_ref().unwrap().is_success()));

    let snap = h.orchestrator.get_memory_context();
    assert_eq!(snap.interactions.len(), 20);
    assert_eq!(snap.created_tasks.len(), 20);
    assert!(snap.interactions.iter().all(|i| !i.task_created));

    let mut ids: Vec<i64> = snap.created_tasks.iter().map(|t| t.task_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

// ── Full stack ──────────────────────────────────────────────────────

/// Answers extraction prompts with a task and enrichment prompts with a
/// priority bump.
struct ScriptedLlm;

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = if request.prompt().starts_with("Extract task information") {
            "```json\n{\"title\": \"Fix database pool\", \"description\": \"Connection pool exhausted\", \"priority\": 2, \"due_date\": null, \"labels\": [\"database\"]}\n```"
        } else {
            r#"{"priority": 3, "labels": ["database", "urgent"]}"#
        };
        Ok(CompletionResponse {
            content: content.to_string(),
        })
    }
}

#[tokio::test]
async fn full_stack_against_stub_tracker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/projects/1/tasks"))
        .and(body_partial_json(json!({
            "title": "Fix database pool",
            "hex_color": "#8C3061",
            "priority": 3
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 314})))
        .expect(1)
        .mount(&server)
        .await;

    let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm);
    let orchestrator = Orchestrator::new(PipelineDeps {
        normalizer: InputNormalizer::new(Arc::new(MockTranscriber::new())),
        extractor: Arc::new(LlmExtractor::new(llm.clone())),
        enricher: Arc::new(LlmEnricher::new(llm)),
        tracker: Arc::new(VikunjaClient::new(VikunjaConfig {
            base_url: server.uri(),
            username: "demo".into(),
            password: SecretString::from("secret"),
            project_id: 1,
        })),
        memory: Arc::new(SessionStore::default()),
    });

    orchestrator.initialize().await.unwrap();
    let envelope = timeout(
        TEST_TIMEOUT,
        orchestrator.process_input(
            "From: dev-lead@company.com\nSubject: URGENT - Fix database connection issue\n\nThe pool is exhausted.",
            "email",
        ),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({
            "success": true,
            "task_id": 314,
            "title": "Fix database pool",
            "source": "email",
            "priority": 3,
            "labels": ["database", "urgent"]
        })
    );
    orchestrator.cleanup().await;
}
