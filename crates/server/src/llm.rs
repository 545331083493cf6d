//! Chat-completions client for OpenAI-compatible endpoints (Groq, OpenAI, Ollama).

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thunai_agent::{ChatMessage, LlmClient};
use thunai_core::config::LlmConfig;
use tracing::warn;

pub struct OpenAiCompatibleClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    /// `None` when the configuration has no usable credentials.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        if !config.is_available() {
            return Ok(None);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building llm http client")?;
        Ok(Some(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        }))
    }

    async fn post(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        };

        let mut attempt = 0;
        loop {
            let mut request = self.client.post(&self.endpoint).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key.expose_secret());
            }

            let outcome = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    if !status.is_server_error() && status.as_u16() != 429 {
                        bail!("llm request rejected with status {status}: {detail}");
                    }
                    anyhow!("llm request failed with status {status}: {detail}")
                }
                Err(error) => anyhow!(error).context("llm request failed"),
            };

            if attempt >= self.max_retries {
                return Err(outcome);
            }
            attempt += 1;
            warn!(
                event_name = "llm.request_retry",
                attempt,
                max_retries = self.max_retries,
                error = %outcome,
                "retrying llm request"
            );
            tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response: CompletionResponse =
            self.post(messages, false).await?.json().await.context("decoding llm response")?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("llm response had no content"))
    }

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        on_chunk: &(dyn for<'c> Fn(&'c str) + Send + Sync),
    ) -> Result<String> {
        let mut bytes = self.post(messages, true).await?.bytes_stream();
        let mut buffer = SseBuffer::default();
        let mut text = String::new();

        while let Some(chunk) = bytes.next().await {
            buffer.push(&chunk.context("reading llm stream")?);
            while let Some(block) = buffer.next_event_block() {
                for delta in deltas(&block) {
                    on_chunk(&delta);
                    text.push_str(&delta);
                }
            }
        }

        Ok(text)
    }
}

/// Accumulates server-sent-event bytes and yields complete `\n\n`-terminated blocks.
#[derive(Debug, Default)]
struct SseBuffer {
    pending: String,
}

impl SseBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
    }

    fn next_event_block(&mut self) -> Option<String> {
        let boundary = self.pending.find("\n\n")?;
        let rest = self.pending.split_off(boundary + 2);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

fn deltas(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.strip_prefix("data:").map(str::trim))
        .filter(|data| *data != "[DONE]")
        .filter_map(|data| serde_json::from_str::<CompletionChunk>(data).ok())
        .flat_map(|chunk| chunk.choices.into_iter().filter_map(|choice| choice.delta.content))
        .filter(|content| !content.is_empty())
        .collect()
}
