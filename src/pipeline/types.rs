//! Result envelope returned for every pipeline invocation.

use serde::Serialize;

use crate::agents::TaskRecord;
use crate::intake::Channel;

/// Outcome of one `process_input` call.
///
/// Serializes flat, with a `success` flag followed by either the created task
/// fields or an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
    Created {
        success: bool,
        /// Backend id, or -1 when none was returned.
        task_id: i64,
        title: String,
        /// Resolved channel.
        source: Channel,
        priority: u8,
        labels: Vec<String>,
    },
    Failed {
        success: bool,
        error: String,
        /// The caller's original hint; resolution may not have finished.
        source: String,
    },
}

impl ResultEnvelope {
    pub fn created(task_id: i64, task: &TaskRecord, source: Channel) -> Self {
        Self::Created {
            success: true,
            task_id,
            title: task.title.clone(),
            source,
            priority: task.priority,
            labels: task.labels.clone(),
        }
    }

    pub fn failed(error: impl Into<String>, hint: &str) -> Self {
        Self::Failed {
            success: false,
            error: error.into(),
            source: hint.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    pub fn task_id(&self) -> Option<i64> {
        match self {
            Self::Created { task_id, .. } => Some(*task_id),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Created { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// The `source` field as it serializes.
    pub fn source(&self) -> &str {
        match self {
            Self::Created { source, .. } => source.as_str(),
            Self::Failed { source, .. } => source,
        }
    }
}
