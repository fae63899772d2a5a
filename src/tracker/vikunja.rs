//! Vikunja REST client.
//!
//! Login is lazy: the bearer token is fetched on the first task creation (or
//! by `connect`) and reused afterwards.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::agents::TaskRecord;
use crate::error::{ConfigError, Error, TrackerError};
use crate::intake::Channel;
use crate::tracker::{CreatedTask, TaskCreator};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const START_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00Z";

/// Connection settings for a Vikunja instance.
#[derive(Debug, Clone)]
pub struct VikunjaConfig {
    pub base_url: String,
    pub username: String,
    pub password: SecretString,
    pub project_id: i64,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct NewTask<'a> {
    title: &'a str,
    project_id: i64,
    start_date: String,
    hex_color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u8>,
}

pub struct VikunjaClient {
    http: reqwest::Client,
    config: VikunjaConfig,
    token: Mutex<Option<SecretString>>,
}

impl VikunjaClient {
    pub fn new(mut config: VikunjaConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn check_credentials(&self) -> Result<(), ConfigError> {
        if self.config.username.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "VIKUNJA_USERNAME".into(),
                hint: "Set VIKUNJA_USERNAME and VIKUNJA_PASSWORD".into(),
            });
        }
        if self.config.password.expose_secret().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "VIKUNJA_PASSWORD".into(),
                hint: "Set VIKUNJA_USERNAME and VIKUNJA_PASSWORD".into(),
            });
        }
        Ok(())
    }

    /// `GET /health` with a short timeout.
    pub async fn health_check(&self) -> bool {
        match self
            .http
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                error!(error = %e, "Vikunja connection test failed");
                false
            }
        }
    }

    async fn login(&self) -> Result<SecretString, TrackerError> {
        let response = self
            .http
            .post(self.url("/api/v1/login"))
            .json(&LoginRequest {
                username: &self.config.username,
                password: self.config.password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Vikunja authentication failed");
            return Err(TrackerError::AuthFailed {
                status: status.as_u16(),
                body,
            });
        }

        let login: LoginResponse = response.json().await?;
        info!("Vikunja authentication successful");
        Ok(SecretString::from(login.token))
    }

    /// Cached token, logging in first if needed.
    async fn token(&self) -> Result<SecretString, TrackerError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await.map_err(|e| {
            warn!(error = %e, "Login before task creation failed");
            TrackerError::NotAuthenticated
        })?;
        *guard = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl TaskCreator for VikunjaClient {
    async fn connect(&self) -> Result<bool, Error> {
        self.check_credentials()?;

        if !self.health_check().await {
            return Ok(false);
        }

        match self.login().await {
            Ok(token) => {
                *self.token.lock().await = Some(token);
                info!(url = %self.config.base_url, "Vikunja connected");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Vikunja login rejected");
                Ok(false)
            }
        }
    }

    async fn create_task(
        &self,
        task: &TaskRecord,
        source: Channel,
    ) -> Result<CreatedTask, TrackerError> {
        let token = self.token().await?;
        let hex_color = hex_color(source);

        let payload = NewTask {
            title: &task.title,
            project_id: self.config.project_id,
            start_date: start_date(task.due_date.as_deref()),
            hex_color,
            description: Some(task.description.as_str()).filter(|d| !d.is_empty()),
            priority: Some(task.priority),
        };

        let response = self
            .http
            .put(self.url(&format!(
                "/api/v1/projects/{}/tasks",
                self.config.project_id
            )))
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Failed to create task");
            return Err(TrackerError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        let created = CreatedTask::from_response(&body);
        info!(
            id = ?created.id,
            title = %task.title,
            color = hex_color,
            source = %source,
            "Task created"
        );
        Ok(created)
    }
}

/// Task colour by input channel.
pub fn hex_color(source: Channel) -> &'static str {
    match source {
        Channel::Voice => "#03346E",
        Channel::Email => "#8C3061",
        Channel::Text => "#1A3636",
    }
}

/// Midnight-UTC start date derived from the due date.
///
/// Unparseable values are passed through as-is; no due date means today.
pub fn start_date(due_date: Option<&str>) -> String {
    let Some(raw) = due_date.filter(|d| !d.is_empty()) else {
        return Local::now().format(START_DATE_FORMAT).to_string();
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format(START_DATE_FORMAT).to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(START_DATE_FORMAT).to_string();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return dt.format(START_DATE_FORMAT).to_string();
        }
    }
    raw.to_string()
}
