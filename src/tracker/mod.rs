//! Task-tracker backends.

pub mod vikunja;

pub use vikunja::{VikunjaClient, VikunjaConfig};

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::TaskRecord;
use crate::error::{Error, TrackerError};
use crate::intake::Channel;

/// Backend response for a created task.
#[derive(Debug, Clone)]
pub struct CreatedTask {
    /// Backend-assigned id, when the response carried one.
    pub id: Option<i64>,
}

impl CreatedTask {
    pub fn from_response(body: &Value) -> Self {
        Self {
            id: body.get("id").and_then(Value::as_i64),
        }
    }
}

/// Persists tasks to an external tracker.
#[async_trait]
pub trait TaskCreator: Send + Sync {
    /// Check reachability and credentials.
    ///
    /// `Ok(false)` means the backend is unreachable or rejected the login;
    /// the pipeline keeps running and task creation will fail per request.
    /// Missing credentials are a configuration error.
    async fn connect(&self) -> Result<bool, Error>;

    /// Create a task. `source` selects the backend colour.
    async fn create_task(
        &self,
        task: &TaskRecord,
        source: Channel,
    ) -> Result<CreatedTask, TrackerError>;

    /// Release backend resources.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_task_reads_integer_id() {
        let created = CreatedTask::from_response(&serde_json::json!({"id": 42, "title": "x"}));
        assert_eq!(created.id, Some(42));
    }

    #[test]
    fn created_task_without_id() {
        assert_eq!(CreatedTask::from_response(&serde_json::json!({})).id, None);
        assert_eq!(
            CreatedTask::from_response(&serde_json::json!({"id": "abc"})).id,
            None
        );
    }
}
