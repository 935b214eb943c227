use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        embedding_model: Option<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            embedding_model,
            temperature,
            max_tokens,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send_chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        parse_chat_response(response, "openai").await
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self.send_chat(messages).await {
            Err(LlmError::RateLimited) => {
                tracing::warn!("OpenAI rate limited, retrying in 1s");
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.send_chat(messages).await
            }
            other => other,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::EmbedUnsupported {
                provider: "openai",
            })?;

        let input = text.replace('\n', " ");
        let body = EmbeddingRequest {
            input: &input,
            model,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        parse_embedding_response(response, "openai").await
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }
}

pub(crate) fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

pub(crate) fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|m| ApiMessage {
            role: role_str(m.role),
            content: &m.content,
        })
        .collect()
}

pub(crate) async fn parse_chat_response(
    response: reqwest::Response,
    provider: &'static str,
) -> Result<String, LlmError> {
    let status = response.status();
    let text = response.text().await.map_err(LlmError::Http)?;

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited);
    }

    if !status.is_success() {
        tracing::error!("{provider} chat API error {status}: {text}");
        return Err(LlmError::Other(format!(
            "{provider} chat request failed (status {status})"
        )));
    }

    let resp: ChatResponse = serde_json::from_str(&text)?;

    resp.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or(LlmError::EmptyResponse { provider })
}

pub(crate) async fn parse_embedding_response(
    response: reqwest::Response,
    provider: &'static str,
) -> Result<Vec<f32>, LlmError> {
    let status = response.status();
    let text = response.text().await.map_err(LlmError::Http)?;

    if !status.is_success() {
        tracing::error!("{provider} embedding API error {status}: {text}");
        return Err(LlmError::Other(format!(
            "{provider} embedding request failed (status {status})"
        )));
    }

    let resp: EmbeddingResponse = serde_json::from_str(&text)?;

    resp.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or(LlmError::EmptyResponse { provider })
}

#[derive(Serialize)]
pub(crate) struct ApiMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ApiMessage<'a>],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Deserialize)]
pub(crate) struct ChoiceMessage {
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub input: &'a str,
    pub model: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
pub(crate) struct EmbeddingData {
    pub embedding: Vec<f32>,
}
