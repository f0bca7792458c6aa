use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::ChatMessage;
use shared::settings::CompletionSettings;
use shared::PipelineError;
use std::time::Duration;

/// Longest slice of a response body quoted back in an error
const ERROR_DETAIL_CHARS: usize = 800;

/// Anything that can turn a conversation into the next command string.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, PipelineError>;
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct HttpCompletionClient {
    http: Client,
    url: String,
    headers: HeaderMap,
    model: Option<String>,
}

impl HttpCompletionClient {
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self, PipelineError> {
        let url = settings
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PipelineError::Config("completion URL is not set".into()))?
            .to_string();

        let mut headers = HeaderMap::new();
        for (name, value) in &settings.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                PipelineError::Config(format!("invalid header name '{}': {}", name, e))
            })?;
            let mut value = HeaderValue::from_str(value).map_err(|e| {
                PipelineError::Config(format!("invalid value for header '{}': {}", name, e))
            })?;
            // Header values usually hold API keys
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url,
            headers,
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, PipelineError> {
        let req = CompletionRequest {
            messages: conversation,
            model: self.model.as_deref(),
        };

        tracing::debug!(url = %self.url, messages = conversation.len(), "requesting completion");

        let resp = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&req)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::Transport(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let detail = truncate_detail(&body);
            if detail.trim().is_empty() {
                return Err(PipelineError::Transport(format!("endpoint returned {}", status)));
            }
            return Err(PipelineError::Transport(format!(
                "endpoint returned {}\n{}",
                status, detail
            )));
        }

        parse_command(&body)
    }
}

/// Pull `choices[0].message.content` out of a response body.
fn parse_command(body: &str) -> Result<String, PipelineError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::Shape(format!("{}: {}", e, truncate_detail(body))))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| PipelineError::Shape(format!("no choices in {}", truncate_detail(body))))
}

fn truncate_detail(body: &str) -> String {
    body.chars().take(ERROR_DETAIL_CHARS).collect()
}
