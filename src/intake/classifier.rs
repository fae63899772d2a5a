//! Input channel detection.
//!
//! Pure string inspection, no I/O. Rules run in priority order and the first
//! match wins:
//! 1. email: starts with `from:`, or contains `to:` or `subject:`
//! 2. voice: contains `[voice]`, `audio:`, `.wav` or `.mp3`
//! 3. text otherwise
//!
//! All checks are on the lower-cased content.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The channel an input arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Text,
    Email,
    Voice,
}

impl Channel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Voice => "voice",
        }
    }

    /// Channel a caller hint forces, if any.
    ///
    /// Only the exact strings `"email"` and `"voice"` force a channel. `"text"`
    /// (or anything else) never overrides detection.
    pub fn forced_by_hint(hint: &str) -> Option<Self> {
        match hint {
            "email" => Some(Self::Email),
            "voice" => Some(Self::Voice),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the channel from content alone.
pub fn classify(content: &str) -> Channel {
    let lower = content.to_lowercase();

    let channel = if lower.starts_with("from:") || lower.contains("to:") || lower.contains("subject:")
    {
        Channel::Email
    } else if lower.contains("[voice]")
        || lower.contains("audio:")
        || lower.contains(".wav")
        || lower.contains(".mp3")
    {
        Channel::Voice
    } else {
        Channel::Text
    };

    debug!(channel = %channel, "Auto-detected input channel");
    channel
}

/// Detect the channel, then apply the caller's hint override.
pub fn resolve_channel(content: &str, hint: &str) -> Channel {
    let detected = classify(content);
    match Channel::forced_by_hint(hint) {
        Some(forced) if forced != detected => {
            debug!(detected = %detected, forced = %forced, "Channel hint overrides detection");
            forced
        }
        _ => detected,
    }
}
