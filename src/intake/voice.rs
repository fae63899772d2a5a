//! Voice transcription backends.
//!
//! The voice channel hands over a file reference, not audio bytes. `mock` mode
//! answers from a fixed table of sample recordings; `real` mode sends the file
//! to Whisper or to Gemini's `generateContent` as inline audio.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, IntakeError};

/// Default Whisper transcription endpoint.
const DEFAULT_WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_AUDIO_MODEL: &str = "gemini-2.5-flash";
const GEMINI_TRANSCRIBE_PROMPT: &str =
    "Transcribe this audio and return ONLY the transcribed text, nothing else:";

/// Transcript returned by the mock backend for unknown files.
const MOCK_FALLBACK_TRANSCRIPT: &str = "Create new task with urgency";

/// Whether transcription hits a real backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMode {
    Mock,
    Real,
}

/// Voice transcription configuration.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub mode: VoiceMode,
    /// Backend used in real mode: `whisper` or `gemini_audio`.
    pub service: String,
    pub whisper_api_key: Option<SecretString>,
    /// Override for the transcription endpoint.
    pub whisper_url: Option<String>,
    pub gemini_api_key: Option<SecretString>,
    /// Override for the Gemini models base URL.
    pub gemini_url: Option<String>,
}

/// Turns an audio file reference into text.
#[async_trait]
pub trait VoiceTranscriber: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &str;

    async fn transcribe(&self, audio_ref: &str) -> Result<String, IntakeError>;
}

/// Build the transcriber selected by configuration.
pub fn create_transcriber(config: &VoiceConfig) -> Result<Arc<dyn VoiceTranscriber>, ConfigError> {
    match config.mode {
        VoiceMode::Mock => Ok(Arc::new(MockTranscriber::new())),
        VoiceMode::Real => match config.service.as_str() {
            "whisper" => {
                let api_key = config
                    .whisper_api_key
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar("WHISPER_API_KEY".into()))?;
                let url = config
                    .whisper_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_WHISPER_URL.to_string());
                Ok(Arc::new(WhisperTranscriber::new(api_key, url)))
            }
            "gemini_audio" => {
                let api_key = config
                    .gemini_api_key
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))?;
                let url = config
                    .gemini_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());
                Ok(Arc::new(GeminiAudioTranscriber::new(api_key, url)))
            }
            other => Err(ConfigError::InvalidValue {
                key: "VOICE_SERVICE".into(),
                message: format!("unsupported transcription service '{other}'"),
            }),
        },
    }
}

/// Strip the channel markers the classifier looks for and return the path part.
///
/// `"[voice] memo.wav"` and `"audio: memo.wav"` both yield `"memo.wav"`.
pub fn audio_path(audio_ref: &str) -> &str {
    let mut path = audio_ref.trim();
    for marker in ["[voice]", "audio:"] {
        if path.len() >= marker.len()
            && path.is_char_boundary(marker.len())
            && path[..marker.len()].eq_ignore_ascii_case(marker)
        {
            path = path[marker.len()..].trim_start();
        }
    }
    path
}

async fn read_audio(path: &Path) -> Result<Vec<u8>, IntakeError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(IntakeError::AudioNotFound(path.display().to_string()));
    }
    Ok(tokio::fs::read(path).await?)
}

// ── Mock ────────────────────────────────────────────────────────────

/// Canned transcripts keyed by file name.
pub struct MockTranscriber {
    transcripts: HashMap<&'static str, &'static str>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        let transcripts = HashMap::from([
            (
                "test_voice_1.wav",
                "Fix the login bug by Friday, it's critical",
            ),
            (
                "test_voice_2.wav",
                "Schedule team sync meeting about new API",
            ),
            (
                "test_voice_3.wav",
                "Review Q1 presentation, needs feedback",
            ),
        ]);
        Self { transcripts }
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceTranscriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, audio_ref: &str) -> Result<String, IntakeError> {
        let file_name = Path::new(audio_path(audio_ref))
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.transcripts.get(file_name.as_str()) {
            Some(text) => {
                info!(file = %file_name, "Mock transcription");
                Ok((*text).to_string())
            }
            None => {
                warn!(file = %file_name, "No mock transcript, using generic response");
                Ok(MOCK_FALLBACK_TRANSCRIPT.to_string())
            }
        }
    }
}

// ── Whisper ─────────────────────────────────────────────────────────

/// Whisper-compatible transcription over HTTP.
pub struct WhisperTranscriber {
    http: reqwest::Client,
    api_key: SecretString,
    url: String,
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: SecretString, url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            url: url.into(),
        }
    }

    fn failure(reason: impl Into<String>) -> IntakeError {
        IntakeError::Transcription {
            service: "whisper".to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VoiceTranscriber for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio_ref: &str) -> Result<String, IntakeError> {
        let path = Path::new(audio_path(audio_ref));
        let bytes = read_audio(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let form = Form::new()
            .text("model", "whisper-1")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(format!("{status}: {body}")));
        }

        let parsed: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("invalid response: {e}")))?;

        info!(chars = parsed.text.len(), "Whisper transcription complete");
        Ok(parsed.text)
    }
}

// ── Gemini ──────────────────────────────────────────────────────────

/// Gemini `generateContent` with the audio sent as inline data.
pub struct GeminiAudioTranscriber {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiAudioTranscriber {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn failure(reason: impl Into<String>) -> IntakeError {
        IntakeError::Transcription {
            service: "gemini_audio".to_string(),
            reason: reason.into(),
        }
    }
}

/// MIME type from the file extension; unknown extensions are sent as WAV.
fn audio_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mp3",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        _ => "audio/wav",
    }
}

#[async_trait]
impl VoiceTranscriber for GeminiAudioTranscriber {
    fn name(&self) -> &str {
        "gemini_audio"
    }

    async fn transcribe(&self, audio_ref: &str) -> Result<String, IntakeError> {
        let path = Path::new(audio_path(audio_ref));
        let bytes = read_audio(path).await?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    ContentPart::Text {
                        text: GEMINI_TRANSCRIBE_PROMPT.to_string(),
                    },
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: audio_mime_type(path),
                            data: BASE64_STANDARD.encode(bytes),
                        },
                    },
                ],
            }],
        };

        let url = format!("{}/{GEMINI_AUDIO_MODEL}:generateContent", self.base_url);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(format!("{status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("invalid response: {e}")))?;

        let text = parsed
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Self::failure("response contained no text"))?;

        info!(chars = text.len(), "Gemini transcription complete");
        Ok(text)
    }
}
