//! Channel-specific normalization of raw input into plain task text.

use std::sync::Arc;

use tracing::info;

use crate::error::IntakeError;
use crate::intake::classifier::{Channel, resolve_channel};
use crate::intake::email::extract_email_text;
use crate::intake::voice::VoiceTranscriber;

/// Normalized input, ready for structure extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub text: String,
    /// The resolved channel (detection plus hint override).
    pub channel: Channel,
}

/// Classifies raw input and dispatches it to the matching normalizer.
///
/// Collaborator failures (malformed email, missing audio) propagate untouched.
pub struct InputNormalizer {
    transcriber: Arc<dyn VoiceTranscriber>,
}

impl InputNormalizer {
    pub fn new(transcriber: Arc<dyn VoiceTranscriber>) -> Self {
        Self { transcriber }
    }

    pub async fn normalize(&self, raw: &str, hint: &str) -> Result<NormalizedInput, IntakeError> {
        let channel = resolve_channel(raw, hint);
        info!(channel = %channel, "Processing input");

        let text = match channel {
            Channel::Text => {
                let text = raw.trim().to_string();
                info!(chars = text.len(), "Text input processed");
                text
            }
            Channel::Email => extract_email_text(raw)?,
            Channel::Voice => {
                let text = self.transcriber.transcribe(raw).await?;
                info!(
                    chars = text.len(),
                    backend = self.transcriber.name(),
                    "Voice transcribed"
                );
                text
            }
        };

        Ok(NormalizedInput { text, channel })
    }
}
