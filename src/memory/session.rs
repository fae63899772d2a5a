//! Bounded in-memory session store.
//!
//! Holds recent interactions and created tasks, oldest first. Each collection
//! is capped at `max_items` (oldest evicted first) and entries older than
//! `ttl` are pruned before every operation.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;

use crate::intake::Channel;

/// Session store limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum entry age. Zero disables expiry.
    pub ttl: Duration,
    /// Capacity of each collection.
    pub max_items: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_items: 100,
        }
    }
}

/// One input received by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    /// Channel hint the caller supplied.
    #[serde(rename = "type")]
    pub kind: String,
    /// Normalized text.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Channel the input was resolved to.
    pub channel: Channel,
    /// Always `false`; interactions are not linked to tasks after the fact.
    pub task_created: bool,
}

/// A task the pipeline created.
#[derive(Debug, Clone, Serialize)]
pub struct TaskMemory {
    /// Backend id, or -1 when the backend returned none.
    pub task_id: i64,
    pub title: String,
    pub source: Channel,
    pub created_at: DateTime<Utc>,
    pub priority: u8,
    pub labels: Vec<String>,
}

/// Aggregates over the stored tasks. Zero-valued when there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPatterns {
    pub average_priority: f64,
    /// Union of all labels, sorted.
    pub common_labels: Vec<String>,
    /// Most frequent source; ties go to the one seen first.
    pub preferred_source: Option<Channel>,
    pub total_tasks: usize,
}

impl UserPatterns {
    pub fn is_empty(&self) -> bool {
        self.total_tasks == 0
    }
}

impl fmt::Display for UserPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Full serializable view of the store.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub interactions: Vec<Interaction>,
    pub created_tasks: Vec<TaskMemory>,
    pub patterns: UserPatterns,
}

#[derive(Default)]
struct SessionState {
    interactions: VecDeque<Interaction>,
    created_tasks: VecDeque<TaskMemory>,
}

pub struct SessionStore {
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Lock the state and drop expired entries.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune_expired(&mut state);
        state
    }

    fn prune_expired(&self, state: &mut SessionState) {
        if self.config.ttl.is_zero() {
            return;
        }
        let Ok(ttl) = TimeDelta::from_std(self.config.ttl) else {
            return;
        };
        let cutoff = Utc::now() - ttl;

        let before = state.interactions.len() + state.created_tasks.len();
        while state
            .interactions
            .front()
            .is_some_and(|i| i.timestamp < cutoff)
        {
            state.interactions.pop_front();
        }
        while state
            .created_tasks
            .front()
            .is_some_and(|t| t.created_at < cutoff)
        {
            state.created_tasks.pop_front();
        }
        let expired = before - (state.interactions.len() + state.created_tasks.len());
        if expired > 0 {
            debug!(expired, "Pruned expired session entries");
        }
    }

    /// Record an input. Stored interactions are never modified afterwards.
    pub fn add_interaction(&self, kind: &str, content: &str, channel: Channel) {
        let mut state = self.lock();
        state.interactions.push_back(Interaction {
            kind: kind.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            channel,
            task_created: false,
        });
        while state.interactions.len() > self.config.max_items {
            state.interactions.pop_front();
        }
    }

    pub fn add_task_created(
        &self,
        task_id: i64,
        title: &str,
        source: Channel,
        priority: u8,
        labels: &[String],
    ) {
        let mut state = self.lock();
        state.created_tasks.push_back(TaskMemory {
            task_id,
            title: title.to_string(),
            source,
            created_at: Utc::now(),
            priority,
            labels: labels.to_vec(),
        });
        while state.created_tasks.len() > self.config.max_items {
            state.created_tasks.pop_front();
        }
    }

    /// Digest of the newest `limit` tasks, oldest of those first.
    pub fn get_context(&self, limit: usize) -> String {
        let state = self.lock();
        let skip = state.created_tasks.len().saturating_sub(limit);
        let mut context = String::from("Recent tasks created:\n");
        for task in state.created_tasks.iter().skip(skip) {
            context.push_str(&format!(
                "- {} (Priority: {}, Labels: {})\n",
                task.title,
                task.priority,
                task.labels.join(", ")
            ));
        }
        context
    }

    pub fn get_user_patterns(&self) -> UserPatterns {
        patterns_of(&self.lock().created_tasks)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            interactions: state.interactions.iter().cloned().collect(),
            created_tasks: state.created_tasks.iter().cloned().collect(),
            patterns: patterns_of(&state.created_tasks),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn patterns_of(tasks: &VecDeque<TaskMemory>) -> UserPatterns {
    if tasks.is_empty() {
        return UserPatterns::default();
    }

    let total: u64 = tasks.iter().map(|t| u64::from(t.priority)).sum();
    let labels: BTreeSet<&str> = tasks
        .iter()
        .flat_map(|t| t.labels.iter().map(String::as_str))
        .collect();

    // Counts in first-seen order so ties resolve to the earliest source.
    let mut counts: Vec<(Channel, usize)> = Vec::new();
    for task in tasks {
        match counts.iter_mut().find(|(c, _)| *c == task.source) {
            Some((_, n)) => *n += 1,
            None => counts.push((task.source, 1)),
        }
    }
    let mut preferred: Option<(Channel, usize)> = None;
    for (channel, n) in counts {
        if preferred.is_none_or(|(_, best)| n > best) {
            preferred = Some((channel, n));
        }
    }

    UserPatterns {
        average_priority: total as f64 / tasks.len() as f64,
        common_labels: labels.into_iter().map(str::to_string).collect(),
        preferred_source: preferred.map(|(c, _)| c),
        total_tasks: tasks.len(),
    }
}
