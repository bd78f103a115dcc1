//! [`ConverseTransport`] backed by the AWS Bedrock runtime SDK

use crate::config::Config;
use crate::conversation::{ContentBlock, Message, Role};
use crate::error::{AppError, BoxError, Result};
use crate::transport::{
    ConverseRequest, ConverseTransport, Delta, EventStream, ResponseBlock, StreamEvent,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock as SdkContentBlock, ContentBlockDelta, ConversationRole, ConverseOutput,
    ConverseStreamOutput, InferenceConfiguration, Message as SdkMessage, ReasoningContentBlock,
    ReasoningContentBlockDelta, SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client;
use futures_util::stream;
use tracing::{debug, instrument};

/// The only service exposing the Converse operations
pub const SERVICE_NAME: &str = "bedrock-runtime";

const CREDENTIALS_SOURCE: &str = "deepseek-bedrock-config";

/// Bedrock runtime client with static credentials
pub struct BedrockTransport {
    client: Client,
}

impl BedrockTransport {
    /// Build an SDK client for the configured region and credentials
    pub fn new(config: &Config) -> Result<Self> {
        config.require_credentials()?;
        if config.service_name != SERVICE_NAME {
            return Err(AppError::ConfigError(format!(
                "Unsupported service '{}', expected '{SERVICE_NAME}'",
                config.service_name
            )));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            CREDENTIALS_SOURCE,
        );
        let sdk_config = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        debug!(region = %config.region, "Created Bedrock runtime client");

        Ok(Self {
            client: Client::from_conf(sdk_config),
        })
    }
}

/// Flatten an SDK error and its sources into one message
fn describe<E: std::error::Error>(err: E) -> BoxError {
    DisplayErrorContext(err).to_string().into()
}

fn sdk_messages(messages: &[Message]) -> std::result::Result<Vec<SdkMessage>, BoxError> {
    messages
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::User => ConversationRole::User,
                Role::Assistant => ConversationRole::Assistant,
            };
            let content = message
                .content
                .iter()
                .map(|block| SdkContentBlock::Text(block.text.clone()))
                .collect();
            SdkMessage::builder()
                .role(role)
                .set_content(Some(content))
                .build()
                .map_err(BoxError::from)
        })
        .collect()
}

fn sdk_system(system: &[ContentBlock]) -> Vec<SystemContentBlock> {
    system
        .iter()
        .map(|block| SystemContentBlock::Text(block.text.clone()))
        .collect()
}

fn sdk_inference(request: &ConverseRequest) -> InferenceConfiguration {
    let params = &request.inference_config;
    InferenceConfiguration::builder()
        .max_tokens(i32::try_from(params.max_tokens).unwrap_or(i32::MAX))
        .temperature(params.temperature)
        .top_p(params.top_p)
        .build()
}

fn response_block(block: &SdkContentBlock) -> ResponseBlock {
    match block {
        SdkContentBlock::Text(text) => ResponseBlock::Text(text.clone()),
        SdkContentBlock::ReasoningContent(ReasoningContentBlock::ReasoningText(reasoning)) => {
            ResponseBlock::Reasoning(reasoning.text().to_string())
        }
        _ => ResponseBlock::Other,
    }
}

fn stream_event(event: ConverseStreamOutput) -> StreamEvent {
    match event {
        ConverseStreamOutput::MessageStart(_) => StreamEvent::MessageStart,
        ConverseStreamOutput::ContentBlockStart(_) => StreamEvent::ContentBlockStart,
        ConverseStreamOutput::ContentBlockDelta(event) => {
            let delta = match event.delta() {
                Some(ContentBlockDelta::Text(text)) => Delta::text(text.clone()),
                Some(ContentBlockDelta::ReasoningContent(ReasoningContentBlockDelta::Text(
                    text,
                ))) => Delta::reasoning(text.clone()),
                _ => Delta::default(),
            };
            StreamEvent::ContentBlockDelta(delta)
        }
        ConverseStreamOutput::ContentBlockStop(_) => StreamEvent::ContentBlockStop,
        ConverseStreamOutput::MessageStop(event) => StreamEvent::MessageStop {
            stop_reason: Some(event.stop_reason().as_str().to_string()),
        },
        ConverseStreamOutput::Metadata(_) => StreamEvent::Metadata,
        _ => StreamEvent::Unknown,
    }
}

#[async_trait]
impl ConverseTransport for BedrockTransport {
    #[instrument(skip_all, fields(model_id = %request.model_id))]
    async fn converse(
        &self,
        request: &ConverseRequest,
    ) -> std::result::Result<Vec<ResponseBlock>, BoxError> {
        let output = self
            .client
            .converse()
            .model_id(&request.model_id)
            .set_messages(Some(sdk_messages(&request.messages)?))
            .set_system(Some(sdk_system(&request.system)))
            .inference_config(sdk_inference(request))
            .send()
            .await
            .map_err(describe)?;

        debug!(stop_reason = %output.stop_reason().as_str(), "Converse completed");

        let blocks = match output.output() {
            Some(ConverseOutput::Message(message)) => {
                message.content().iter().map(response_block).collect()
            }
            _ => Vec::new(),
        };
        Ok(blocks)
    }

    #[instrument(skip_all, fields(model_id = %request.model_id))]
    async fn converse_stream(
        &self,
        request: &ConverseRequest,
    ) -> std::result::Result<Option<EventStream>, BoxError> {
        let output = self
            .client
            .converse_stream()
            .model_id(&request.model_id)
            .set_messages(Some(sdk_messages(&request.messages)?))
            .set_system(Some(sdk_system(&request.system)))
            .inference_config(sdk_inference(request))
            .send()
            .await
            .map_err(describe)?;

        let events = stream::unfold(output.stream, |mut receiver| async move {
            match receiver.recv().await {
                Ok(Some(event)) => Some((Ok(stream_event(event)), receiver)),
                Ok(None) => None,
                Err(err) => Some((Err(describe(err)), receiver)),
            }
        });

        Ok(Some(Box::pin(events)))
    }
}
