use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::config::{LlmProvider, Settings};
use crate::db::models::{Message, Role, null_as_empty};
use crate::request_counter::RequestCounter;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend connection error: {0}")]
    Connection(#[source] reqwest::Error),
    #[error("Backend error: HTTP {0}")]
    Status(u16),
    #[error("Invalid JSON response from backend: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Could not read {path} for ingestion: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    message: &'a str,
    history: Vec<HistoryTurn<'a>>,
    user_age: Option<u32>,
    llm_provider: LlmProvider,
    api_key: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct HistoryTurn<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct IngestPayload<'a> {
    document_id: i64,
    source: Cow<'a, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_content: Option<String>,
}

/// Completion returned by `/api/chat`. Anything beyond the known fields is
/// passed back to the browser untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub chunks: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum IngestSource {
    Pdf(PathBuf),
    Url(String),
}

impl IngestSource {
    fn kind(&self) -> &'static str {
        match self {
            IngestSource::Pdf(_) => "pdf",
            IngestSource::Url(_) => "url",
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    llm_provider: LlmProvider,
    api_key: Option<String>,
    counter: RequestCounter,
}

impl BackendClient {
    pub fn new(settings: &Settings, counter: RequestCounter) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.backend_timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.backend_url.trim_end_matches('/').to_string(),
            llm_provider: settings.llm_provider,
            api_key: settings.api_key().map(str::to_string),
            counter,
        })
    }

    pub fn counter(&self) -> &RequestCounter {
        &self.counter
    }

    pub async fn chat(
        &self,
        message: &str,
        history: &[Message],
        user_age: Option<u32>,
    ) -> Result<ChatReply, BackendError> {
        let payload = ChatPayload {
            message,
            history: history
                .iter()
                .map(|m| HistoryTurn { role: m.role, content: &m.content })
                .collect(),
            user_age,
            llm_provider: self.llm_provider,
            api_key: self.api_key.as_deref(),
        };

        self.counter.log_chat_request(&format!(
            "User query: {} | History: {}",
            message.chars().take(50).collect::<String>(),
            history.len()
        ));

        self.post("/api/chat", &payload).await
    }

    pub async fn ingest(&self, document_id: i64, source: &IngestSource) -> Result<IngestReply, BackendError> {
        let path = format!("/api/ingest/{}", source.kind());

        let payload = match source {
            IngestSource::Pdf(file) => {
                let bytes = tokio::fs::read(file).await.map_err(|e| BackendError::Io {
                    path: file.display().to_string(),
                    source: e,
                })?;
                IngestPayload {
                    document_id,
                    source: file.to_string_lossy(),
                    filename: file_name(file),
                    file_content: Some(BASE64.encode(bytes)),
                }
            }
            IngestSource::Url(url) => IngestPayload {
                document_id,
                source: Cow::Borrowed(url.as_str()),
                filename: None,
                file_content: None,
            },
        };

        self.counter
            .log_ingest_request(&format!("Document {} ({})", document_id, source.kind()));

        self.post(&path, &payload).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let result: Result<R, BackendError> = async {
            let res = self
                .http
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(BackendError::Connection)?;

            let status = res.status();
            if status != StatusCode::OK {
                return Err(BackendError::Status(status.as_u16()));
            }

            let bytes = res.bytes().await.map_err(BackendError::Connection)?;
            serde_json::from_slice::<R>(&bytes).map_err(BackendError::Parse)
        }
        .await;

        if let Err(e) = &result {
            self.counter.log_failure();
            tracing::warn!("Backend call to {} failed: {}", url, e);
        }

        result
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}
