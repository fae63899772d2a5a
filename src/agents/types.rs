//! Task record types shared by the extraction and enrichment stages.

use serde::{Deserialize, Deserializer, Serialize};

/// Highest task priority (urgent).
pub const MAX_PRIORITY: u8 = 3;

/// Priority used when nothing better is known.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Characters of input used as a fallback title.
const FALLBACK_TITLE_CHARS: usize = 50;

/// A fully populated task, ready for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: String,
    pub description: String,
    /// 0 = low … 3 = urgent.
    pub priority: u8,
    /// `YYYY-MM-DD` as produced by the model; not validated here.
    pub due_date: Option<String>,
    pub labels: Vec<String>,
}

/// A possibly-partial task as returned by a model.
///
/// `None` means "key absent". For `due_date`, `Some(None)` is an explicit
/// `null` and clears the value when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl TaskPatch {
    /// The record substituted when extraction fails.
    pub fn degraded(text: &str) -> Self {
        Self {
            title: Some(fallback_title(text)),
            description: Some(text.to_string()),
            priority: Some(i64::from(DEFAULT_PRIORITY)),
            due_date: Some(None),
            labels: Some(vec!["inbox".to_string()]),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TaskRecord {
    /// Build a record from an extraction result, filling absent fields from
    /// the source text.
    pub fn from_patch(patch: TaskPatch, source_text: &str) -> Self {
        let base = Self {
            title: fallback_title(source_text),
            description: source_text.to_string(),
            priority: DEFAULT_PRIORITY,
            due_date: None,
            labels: Vec::new(),
        };
        base.merged(patch)
    }

    /// Field-by-field override: present keys in `patch` win.
    pub fn merged(mut self, patch: TaskPatch) -> Self {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(priority) = patch.priority {
            self.priority = clamp_priority(priority);
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(labels) = patch.labels {
            self.labels = labels;
        }
        self
    }
}

/// Clamp an arbitrary model-supplied priority into `0..=3`.
pub fn clamp_priority(priority: i64) -> u8 {
    priority.clamp(0, i64::from(MAX_PRIORITY)) as u8
}

/// First 50 characters of the input.
pub fn fallback_title(text: &str) -> String {
    text.chars().take(FALLBACK_TITLE_CHARS).collect()
}
