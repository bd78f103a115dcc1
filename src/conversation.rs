//! Conversation and inference-parameter types sent to the Converse API

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// System prompt used when the caller does not supply one
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You're a helpful assistant";

/// Role of a turn in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking
    User,
    /// The model
    Assistant,
}

impl Role {
    /// Capitalized label used when flattening history into plain text
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// A text content block, `{"text": "..."}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block text
    pub text: String,
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One user or assistant turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker of the turn
    pub role: Role,
    /// Text blocks of the turn
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user turn holding a single text block
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant turn holding a single text block
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// System prompt plus ordered turns for a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Always exactly one entry
    pub system: Vec<ContentBlock>,
    /// Turns in order; a new conversation holds one user turn
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Build a conversation from one user message and an optional system prompt.
    ///
    /// The message is stored verbatim; only emptiness is rejected. Length limits
    /// are left to the remote endpoint.
    pub fn new(user_message: &str, system_message: Option<&str>) -> Result<Self> {
        if user_message.is_empty() {
            return Err(AppError::EmptyMessage);
        }

        Ok(Self {
            system: vec![ContentBlock::text(
                system_message.unwrap_or(DEFAULT_SYSTEM_MESSAGE),
            )],
            messages: vec![Message::user(user_message)],
        })
    }

    /// The system prompt text
    pub fn system_text(&self) -> &str {
        self.system.first().map_or("", |block| block.text.as_str())
    }
}

/// Sampling and length settings, serialized as the `inferenceConfig` block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceParams {
    /// Response token limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.5,
            top_p: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_one_system_entry_and_one_user_turn() {
        let conversation =
            Conversation::new("What is the speed of light?", Some("You are a physicist"))
                .unwrap();

        assert_eq!(conversation.system, vec![ContentBlock::text("You are a physicist")]);
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(
            conversation.messages[0].content,
            vec![ContentBlock::text("What is the speed of light?")]
        );
    }

    #[test]
    fn falls_back_to_default_persona() {
        let conversation = Conversation::new("hi", None).unwrap();
        assert_eq!(conversation.system_text(), DEFAULT_SYSTEM_MESSAGE);
    }

    #[test]
    fn keeps_message_verbatim() {
        let message = "  spaced\n\tout  ";
        let conversation = Conversation::new(message, None).unwrap();
        assert_eq!(conversation.messages[0].content[0].text, message);
    }

    #[test]
    fn rejects_empty_message() {
        assert!(matches!(
            Conversation::new("", None),
            Err(AppError::EmptyMessage)
        ));
    }

    #[test]
    fn wire_shape() {
        let conversation = Conversation::new("hello", Some("sys")).unwrap();
        let json = serde_json::to_value(&conversation).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "system": [{"text": "sys"}],
                "messages": [{"role": "user", "content": [{"text": "hello"}]}]
            })
        );
    }
}
