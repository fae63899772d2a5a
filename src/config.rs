//! Configuration types.
//!
//! Everything is read from environment variables. Each concern keeps its own
//! config struct next to the code that consumes it; `TaskflowConfig` only
//! assembles them.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::intake::voice::{VoiceConfig, VoiceMode};
use crate::llm::{LlmBackend, LlmConfig};
use crate::memory::SessionConfig;
use crate::observability::{LogFormat, LoggingConfig};
use crate::tracker::vikunja::VikunjaConfig;

/// Default Session Store TTL (1 hour).
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Default Session Store capacity per collection.
const DEFAULT_MAX_MEMORY_ITEMS: usize = 100;

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct TaskflowConfig {
    pub llm: LlmConfig,
    pub tracker: VikunjaConfig,
    pub voice: VoiceConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl TaskflowConfig {
    /// Build config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        Ok(Self {
            llm: llm_config(&env)?,
            tracker: tracker_config(&env)?,
            voice: voice_config(&env)?,
            session: SessionConfig {
                ttl: Duration::from_secs(
                    env.parse_or("SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECS)?,
                ),
                max_items: env.parse_or("MAX_MEMORY_ITEMS", DEFAULT_MAX_MEMORY_ITEMS)?,
            },
            logging: LoggingConfig {
                level: env.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                format: match env.get("TASKFLOW_LOG_FORMAT").as_deref() {
                    None | Some("pretty") => LogFormat::Pretty,
                    Some("json") => LogFormat::Json,
                    Some(other) => {
                        return Err(ConfigError::InvalidValue {
                            key: "TASKFLOW_LOG_FORMAT".into(),
                            message: format!("expected 'pretty' or 'json', got '{other}'"),
                        });
                    }
                },
                directory: env.get("TASKFLOW_LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn llm_config(env: &Env<'_>) -> Result<LlmConfig, ConfigError> {
    let backend = match env.get("TASKFLOW_LLM_BACKEND").as_deref() {
        None | Some("anthropic") => LlmBackend::Anthropic,
        Some("openai") => LlmBackend::OpenAi,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                key: "TASKFLOW_LLM_BACKEND".into(),
                message: format!("unsupported backend '{other}'"),
            });
        }
    };

    let fallback_key = match backend {
        LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        LlmBackend::OpenAi => "OPENAI_API_KEY",
    };
    let api_key = env
        .get("TASKFLOW_LLM_API_KEY")
        .or_else(|| env.get(fallback_key))
        .ok_or_else(|| ConfigError::MissingEnvVar("TASKFLOW_LLM_API_KEY".into()))?;

    let model = env.get("TASKFLOW_LLM_MODEL").unwrap_or_else(|| {
        match backend {
            LlmBackend::Anthropic => "claude-sonnet-4-20250514",
            LlmBackend::OpenAi => "gpt-4o",
        }
        .to_string()
    });

    Ok(LlmConfig {
        backend,
        api_key: SecretString::from(api_key),
        model,
    })
}

fn tracker_config(env: &Env<'_>) -> Result<VikunjaConfig, ConfigError> {
    Ok(VikunjaConfig {
        base_url: env
            .get("VIKUNJA_URL")
            .unwrap_or_else(|| "http://localhost:3456".to_string()),
        username: env.get("VIKUNJA_USERNAME").unwrap_or_default(),
        password: SecretString::from(env.get("VIKUNJA_PASSWORD").unwrap_or_default()),
        project_id: env.parse_or("VIKUNJA_PROJECT_ID", 1)?,
    })
}

fn voice_config(env: &Env<'_>) -> Result<VoiceConfig, ConfigError> {
    let mode = match env.get("VOICE_MODE").as_deref() {
        None | Some("mock") => VoiceMode::Mock,
        Some("real") => VoiceMode::Real,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                key: "VOICE_MODE".into(),
                message: format!("expected 'mock' or 'real', got '{other}'"),
            });
        }
    };

    Ok(VoiceConfig {
        mode,
        service: env
            .get("VOICE_SERVICE")
            .unwrap_or_else(|| "whisper".to_string()),
        whisper_api_key: env.get("WHISPER_API_KEY").map(SecretString::from),
        whisper_url: env.get("WHISPER_API_URL"),
        gemini_api_key: env.get("GEMINI_API_KEY").map(SecretString::from),
        gemini_url: env.get("GEMINI_API_URL"),
    })
}

/// Thin wrapper over a lookup closure; empty values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            }),
        }
    }
}
