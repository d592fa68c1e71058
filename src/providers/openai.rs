use crate::core::chat::{ChatError, ChatProvider, ChatRequest};
use crate::core::error::FetchError;
use crate::providers::util::{build_client, check_status};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Client for the `/chat/completions` endpoint of OpenAI and of compatible
/// local servers such as LM Studio or LocalAI.
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::MissingApiKey);
        }
        Ok(OpenAiCompatibleProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client: build_client(timeout_secs)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    #[instrument(
        name = "ChatCompletion",
        skip(self, request),
        fields(model = %request.model, messages = request.messages.len())
    )]
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Posting chat completion to {}", url);

        // Completions are not idempotent, so no retry here
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(FetchError::from)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ChatError::Unauthorized);
            }
            StatusCode::NOT_FOUND => {
                return Err(ChatError::ModelNotAvailable(request.model.clone()));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ChatError::RateLimited),
            _ => {}
        }
        let response = check_status(response)?;

        let text = response.text().await.map_err(FetchError::from)?;
        let data: CompletionResponse = serde_json::from_str(&text).map_err(|e| {
            FetchError::Malformed(format!("Failed to parse chat completion response: {e}"))
        })?;

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ChatError::EmptyReply)
    }
}
