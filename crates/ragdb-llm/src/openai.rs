//! Blocking client for OpenAI-compatible `/chat/completions` endpoints.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use ragdb_core::config::GenerationSettings;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Generator;

/// Sends the whole prompt as one user message and returns the first choice.
///
/// Requests are bounded by `timeout_secs`. Rate limits, server errors,
/// connect failures and timeouts are retried up to `max_retries` extra times
/// with exponential backoff.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: usize,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, settings: &GenerationSettings) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfiguration("missing generator API key".to_string()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| Error::InvalidConfiguration("invalid generator API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfiguration(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_retries: settings.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    fn send_once(&self, prompt: &str) -> std::result::Result<String, Attempt> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().map_err(Attempt::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Attempt::Status(status, text));
        }
        let parsed: ChatResponse = resp.json().map_err(|e| {
            if e.is_timeout() {
                Attempt::Transport(e)
            } else {
                Attempt::Fatal(Error::Upstream(format!("failed to parse chat completion: {e}")))
            }
        })?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| Attempt::Fatal(Error::Upstream("chat completion returned no choices".to_string())))
    }
}

impl Generator for OpenAiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0usize;
        loop {
            let failure = match self.send_once(prompt) {
                Ok(text) => {
                    tracing::debug!(model = %self.model, attempts = attempt + 1, chars = text.len(), "generation complete");
                    return Ok(text);
                }
                Err(failure) => failure,
            };
            if failure.retryable() && attempt < self.max_retries {
                attempt += 1;
                let wait = retry_backoff(attempt);
                tracing::warn!(attempt, max_retries = self.max_retries, wait_ms = wait.as_millis() as u64, error = %failure.describe(), "retrying generation");
                thread::sleep(wait);
                continue;
            }
            let err = failure.into_error();
            tracing::error!(kind = err.kind(), error = %err, "generation failed");
            return Err(err);
        }
    }
}

/// Outcome of one failed request.
enum Attempt {
    Transport(reqwest::Error),
    Status(StatusCode, String),
    Fatal(Error),
}

impl Attempt {
    fn retryable(&self) -> bool {
        match self {
            Attempt::Transport(e) => e.is_timeout() || e.is_connect(),
            Attempt::Status(status, _) => *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
            Attempt::Fatal(_) => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Attempt::Transport(e) => e.to_string(),
            Attempt::Status(status, _) => status.to_string(),
            Attempt::Fatal(e) => e.to_string(),
        }
    }

    fn into_error(self) -> Error {
        match self {
            Attempt::Transport(e) if e.is_timeout() => Error::UpstreamTimeout(format!("chat completion timed out: {e}")),
            Attempt::Transport(e) => Error::Upstream(format!("chat completion request failed: {e}")),
            Attempt::Status(status, body) => Error::Upstream(format!("chat completion returned {status}: {body}")),
            Attempt::Fatal(e) => e,
        }
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = u32::try_from(attempt.min(5)).unwrap_or(5);
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
