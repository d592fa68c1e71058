//! Chat transcript state and the completion provider seam.

use crate::core::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No API key configured. Set chat.api_key or OPENAI_API_KEY")]
    MissingApiKey,

    #[error("The server rejected the API key")]
    Unauthorized,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("The server returned no reply")]
    EmptyReply,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// The conversation held for the lifetime of one interactive session.
///
/// The system prompt is not part of the transcript; it is prepended to every
/// request. Switching to a different model starts a fresh transcript.
#[derive(Debug, Clone)]
pub struct ChatSession {
    model: String,
    system_prompt: Option<String>,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(model: &str, system_prompt: Option<&str>, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            system_prompt: system_prompt
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            temperature,
            messages: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns `true` when the model changed and the transcript was cleared.
    pub fn set_model(&mut self, model: &str) -> bool {
        let model = model.trim();
        if model.is_empty() || model == self.model {
            return false;
        }
        self.model = model.to_string();
        self.messages.clear();
        true
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(ChatMessage::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(ChatMessage::new(Role::Assistant, content));
    }

    /// Drops the last message if it is an unanswered user turn.
    pub fn discard_pending(&mut self) -> Option<ChatMessage> {
        match self.messages.last() {
            Some(last) if last.role == Role::User => self.messages.pop(),
            _ => None,
        }
    }

    pub fn request(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::new(Role::System, prompt.as_str()));
        }
        messages.extend(self.messages.iter().cloned());
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError>;
}
