use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::LanguageModel;
use crate::config::LlmConfig;
use crate::error::{Error, Result};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
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
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible chat completions endpoint
///
/// Every request is bounded by the configured timeout. Timeouts, transport
/// errors, 429 and 5xx responses are retried with exponential backoff.
pub struct ChatClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
    initial_backoff: Duration,
}

impl ChatClient {
    /// Build a client, reading the credential from the configured variable
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "environment variable {} must hold the API key for {}",
                config.api_key_env, config.endpoint
            ))
        })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        info!("LLM client ready: model={} endpoint={}", config.model, config.endpoint);

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        })
    }

    fn send_once(&self, prompt: &str, attempt: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                Error::Timeout { attempts: attempt }
            } else {
                Error::Transport(e.to_string())
            }
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(to_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Llm {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().map_err(to_error)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!("LLM reply: {} characters", content.len());
        Ok(content)
    }
}

impl LanguageModel for ChatClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(prompt, attempt) {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    let delay = backoff_delay(self.initial_backoff, attempt - 1);
                    warn!(
                        "LLM attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                }
                Err(Error::Timeout { .. }) => return Err(Error::Timeout { attempts: attempt }),
                Err(e) => return Err(e),
            }
        }
    }
}

/// A `ChatClient` built on the first prompt
///
/// Commands that never reach the model do not need the credential.
pub struct LazyChatClient {
    config: LlmConfig,
    client: OnceCell<ChatClient>,
}

impl LazyChatClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&ChatClient> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = ChatClient::from_config(&self.config)?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl LanguageModel for LazyChatClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.client()?.complete(prompt)
    }
}

/// Delay before retry number `retry` (0-based): doubles each time, capped
fn backoff_delay(initial: Duration, retry: u32) -> Duration {
    initial
        .checked_mul(2u32.saturating_pow(retry))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}
