//! Chat session state: transcript and per-session model settings

use crate::config::Config;
use crate::conversation::{InferenceParams, Role};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Earlier messages folded into each new question
pub const CONTEXT_MESSAGES: usize = 10;

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it
    pub role: Role,
    /// The question, or the final answer without reasoning
    pub content: String,
}

/// Settings adjustable during a chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// System prompt sent with every question
    pub system_prompt: String,
    /// Sampling temperature, 0.0-1.0
    pub temperature: f32,
    /// Response token limit, 256-8192
    pub max_tokens: u32,
    /// Nucleus sampling threshold, 0.0-1.0
    pub top_p: f32,
    /// Stream fragments as they arrive instead of waiting for the full answer
    pub streaming: bool,
}

impl ChatSettings {
    /// Chat defaults with every value the configuration sets applied on top
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature.unwrap_or(defaults.temperature),
            max_tokens: config.max_tokens.unwrap_or(defaults.max_tokens),
            top_p: config.top_p.unwrap_or(defaults.top_p),
            streaming: defaults.streaming,
        }
    }

    /// Inference parameters for the next request
    pub const fn params(&self) -> InferenceParams {
        InferenceParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: "You're a helpful assistant that specializes in physics.".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 0.9,
            streaming: true,
        }
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Random session id, also the transcript file name
    pub id: String,
    /// When the session started
    pub created_at: DateTime<Utc>,
    /// Model id the session talks to
    pub model: String,
    /// Current settings
    pub settings: ChatSettings,
    /// Transcript in order
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create a new session
    pub fn new(model: impl Into<String>, settings: ChatSettings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            model: model.into(),
            settings,
            messages: Vec::new(),
        }
    }

    /// Record the user's question
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Record the assistant's final answer
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    /// Drop the transcript, keeping settings
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Get the conversation history
    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Build the text sent for `input`, prefixing recent history as plain text.
    ///
    /// Expects `input` to already be the last transcript entry; up to
    /// [`CONTEXT_MESSAGES`] entries before it are included.
    pub fn contextual_query(&self, input: &str) -> String {
        let earlier = self.messages.len().saturating_sub(1);
        if earlier == 0 {
            return input.to_string();
        }

        let start = earlier.saturating_sub(CONTEXT_MESSAGES);
        let mut query = String::from("\n\nPrevious conversation:\n");
        for message in &self.messages[start..earlier] {
            query.push_str(message.role.label());
            query.push_str(": ");
            query.push_str(&message.content);
            query.push('\n');
        }
        query.push_str("\n\nCurrent question: ");
        query.push_str(input);
        query
    }

    /// Save session to file
    pub async fn save(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let path = path.unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push("deepseek-bedrock");
            path.push("sessions");
            path.push(format!("{}.json", self.id));
            path
        });

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;

        Ok(path)
    }

    /// Load session from file
    pub async fn load(path: PathBuf) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let session = serde_json::from_str(&json)?;
        Ok(session)
    }
}
