//! Mistral chat-completions client.
//!
//! Speaks the OpenAI-compatible `POST {base_url}/chat/completions` endpoint.
//! Rate limiting and non-2xx replies come back as [`GenerationError`]s so the
//! scheduler's retry policy can deal with them.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use retone_ai::{ChatMessage, GenerationError, GenerationOptions, Generator};

use crate::config::{ConfigError, MistralConfig};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    options: &'a GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<ReplyContent>,
}

/// Plain string, or a list of typed chunks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    #[serde(default)]
    text: Option<String>,
}

pub struct MistralGenerator {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl MistralGenerator {
    pub fn new(config: &MistralConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                var: "MISTRAL_BASE_URL",
                value: config.base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for MistralGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralGenerator")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl Generator for MistralGenerator {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            options,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let reply = parse_reply(&body)?;

        debug!(model = %self.model, reply_chars = reply.chars().count(), "mistral reply received");
        Ok(reply)
    }
}

/// Text of the first choice in a chat-completions body.
fn parse_reply(body: &str) -> Result<String, GenerationError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(GenerationError::EmptyReply)?;

    let text = match content {
        ReplyContent::Text(text) => text,
        ReplyContent::Chunks(chunks) => chunks.into_iter().filter_map(|c| c.text).collect(),
    };

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyReply);
    }
    Ok(text)
}
