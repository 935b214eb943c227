//! Azure OpenAI backend.
//!
//! Same wire shapes as the OpenAI backend, but deployment-scoped URLs and
//! `api-key` header auth. The chat model and the embedding model are
//! addressed by deployment name, not by model id.

use std::fmt;
use std::time::Duration;

use crate::error::LlmError;
use crate::openai::{ChatRequest, EmbeddingRequest, convert_messages};
use crate::provider::{LlmProvider, Message};

#[derive(Clone)]
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    api_version: String,
    chat_deployment: String,
    embedding_deployment: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("chat_deployment", &self.chat_deployment)
            .field("embedding_deployment", &self.embedding_deployment)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AzureOpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut endpoint: String,
        api_version: String,
        chat_deployment: String,
        embedding_deployment: Option<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            endpoint,
            api_version,
            chat_deployment,
            embedding_deployment,
            temperature,
            max_tokens,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment, operation, self.api_version
        )
    }

    async fn send_chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.chat_deployment,
            messages: &api_messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(self.deployment_url(&self.chat_deployment, "chat/completions"))
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        crate::openai::parse_chat_response(response, "azure-openai").await
    }
}

impl LlmProvider for AzureOpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self.send_chat(messages).await {
            Err(LlmError::RateLimited) => {
                tracing::warn!("Azure OpenAI rate limited, retrying in 1s");
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.send_chat(messages).await
            }
            other => other,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let deployment =
            self.embedding_deployment
                .as_deref()
                .ok_or(LlmError::EmbedUnsupported {
                    provider: "azure-openai",
                })?;

        let input = text.replace('\n', " ");
        let body = EmbeddingRequest {
            input: &input,
            model: deployment,
        };

        let response = self
            .client
            .post(self.deployment_url(deployment, "embeddings"))
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        crate::openai::parse_embedding_response(response, "azure-openai").await
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_deployment.is_some()
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "azure-openai"
    }
}
