//! Deepseek-R1 client over the Bedrock Converse API

use crate::bedrock::BedrockTransport;
use crate::config::Config;
use crate::conversation::{Conversation, InferenceParams};
use crate::demux::{demultiplex, FragmentStream};
use crate::error::{AppError, Result};
use crate::transport::{ConverseRequest, ConverseTransport, ResponseBlock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Complete output of a blocking call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelResponse {
    /// The visible answer
    pub response_text: String,
    /// The model's reasoning trace
    pub reasoning_text: String,
}

/// Client bound to one model id
pub struct BedrockClient {
    model_id: String,
    transport: Arc<dyn ConverseTransport>,
}

impl BedrockClient {
    /// Create a client talking to Bedrock with the configured credentials
    pub fn new(config: &Config) -> Result<Self> {
        let transport = BedrockTransport::new(config)?;
        Ok(Self::with_transport(&config.model_id, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(model_id: &str, transport: Arc<dyn ConverseTransport>) -> Self {
        Self {
            model_id: model_id.to_string(),
            transport,
        }
    }

    /// Model id every request targets
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Build a conversation from a user message and optional system prompt
    pub fn create_conversation(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<Conversation> {
        Conversation::new(user_message, system_message)
    }

    fn request(&self, conversation: &Conversation, params: &InferenceParams) -> ConverseRequest {
        let request = ConverseRequest::new(&self.model_id, conversation, params);
        if let Ok(body) = serde_json::to_string(&request) {
            debug!(request = %body, "Prepared Converse request");
        }
        request
    }

    /// Send a blocking request and split the answer from the reasoning.
    ///
    /// The first text block is the answer and the first reasoning block is the
    /// reasoning, wherever they appear in the response.
    #[instrument(skip(self, conversation), fields(model_id = %self.model_id))]
    pub async fn query_model(
        &self,
        conversation: &Conversation,
        params: &InferenceParams,
    ) -> Result<ModelResponse> {
        let request = self.request(conversation, params);

        let blocks = self
            .transport
            .converse(&request)
            .await
            .map_err(|reason| AppError::invocation(&self.model_id, reason))?;

        debug!(blocks = blocks.len(), "Received Converse response");

        let response_text = blocks.iter().find_map(|block| match block {
            ResponseBlock::Text(text) => Some(text.clone()),
            _ => None,
        });
        let reasoning_text = blocks.iter().find_map(|block| match block {
            ResponseBlock::Reasoning(text) => Some(text.clone()),
            _ => None,
        });

        let missing = |block| AppError::MissingContentBlock {
            model_id: self.model_id.clone(),
            block,
        };

        Ok(ModelResponse {
            response_text: response_text.ok_or_else(|| missing("text"))?,
            reasoning_text: reasoning_text.ok_or_else(|| missing("reasoning"))?,
        })
    }

    /// Stream the answer and the reasoning as classified fragments.
    ///
    /// Nothing is sent until the returned stream is first polled.
    #[instrument(skip(self, conversation), fields(model_id = %self.model_id))]
    pub fn stream_query_model(
        &self,
        conversation: &Conversation,
        params: &InferenceParams,
    ) -> FragmentStream {
        let request = self.request(conversation, params);
        demultiplex(Arc::clone(&self.transport), request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use pretty_assertions::assert_eq;

    fn client(transport: ScriptedTransport) -> (BedrockClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = BedrockClient::with_transport("us.deepseek.r1-v1:0", transport.clone());
        (client, transport)
    }

    #[tokio::test]
    async fn blocking_call_splits_answer_and_reasoning() {
        let (client, transport) = client(ScriptedTransport::with_blocks(vec![
            ResponseBlock::Text("About 299,792 km/s.".to_string()),
            ResponseBlock::Reasoning("Light speed is a constant c.".to_string()),
        ]));
        let conversation = client
            .create_conversation("What is the speed of light?", None)
            .unwrap();

        let response = client
            .query_model(&conversation, &InferenceParams::default())
            .await
            .unwrap();

        assert_eq!(response.response_text, "About 299,792 km/s.");
        assert_eq!(response.reasoning_text, "Light speed is a constant c.");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model_id, "us.deepseek.r1-v1:0");
        assert_eq!(requests[0].inference_config, InferenceParams::default());
    }

    #[tokio::test]
    async fn blocking_call_accepts_reasoning_first() {
        let (client, _) = client(ScriptedTransport::with_blocks(vec![
            ResponseBlock::Reasoning("think".to_string()),
            ResponseBlock::Other,
            ResponseBlock::Text("answer".to_string()),
        ]));
        let conversation = client.create_conversation("q", None).unwrap();

        let response = client
            .query_model(&conversation, &InferenceParams::default())
            .await
            .unwrap();

        assert_eq!(response.response_text, "answer");
        assert_eq!(response.reasoning_text, "think");
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped() {
        let (client, _) = client(ScriptedTransport::failing("UnrecognizedClientException"));
        let conversation = client.create_conversation("q", None).unwrap();

        let err = client
            .query_model(&conversation, &InferenceParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Invocation { .. }));
        let message = err.to_string();
        assert!(message.contains("us.deepseek.r1-v1:0"));
        assert!(message.contains("UnrecognizedClientException"));
    }
}
