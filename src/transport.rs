//! Transport seam between the client and the Converse API.
//!
//! [`ConverseTransport`] is the only thing the client knows about the remote
//! service. The production implementation lives in [`crate::bedrock`]; tests
//! drive the client through [`ScriptedTransport`].

use crate::conversation::{ContentBlock, Conversation, InferenceParams, Message};
use crate::error::BoxError;
use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Request body for `Converse` / `ConverseStream`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    /// Target model or inference profile
    pub model_id: String,
    /// Conversation turns
    pub messages: Vec<Message>,
    /// System prompt blocks
    pub system: Vec<ContentBlock>,
    /// Sampling and length settings
    pub inference_config: InferenceParams,
}

impl ConverseRequest {
    /// Assemble the request for a conversation
    pub fn new(model_id: &str, conversation: &Conversation, params: &InferenceParams) -> Self {
        Self {
            model_id: model_id.to_string(),
            messages: conversation.messages.clone(),
            system: conversation.system.clone(),
            inference_config: *params,
        }
    }
}

/// One block of a blocking response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBlock {
    /// Answer text
    Text(String),
    /// Reasoning text
    Reasoning(String),
    /// Tool use, images, redacted reasoning and anything newer than this client
    Other,
}

/// Content delta carried by a `contentBlockDelta` event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// `delta.text`
    pub text: Option<String>,
    /// `delta.reasoningContent.text`
    pub reasoning_text: Option<String>,
}

impl Delta {
    /// Plain answer text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            reasoning_text: None,
        }
    }

    /// Reasoning text
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            text: None,
            reasoning_text: Some(text.into()),
        }
    }
}

/// Events of a `ConverseStream` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// `messageStart`
    MessageStart,
    /// `contentBlockStart`
    ContentBlockStart,
    /// `contentBlockDelta`, the only event carrying text
    ContentBlockDelta(Delta),
    /// `contentBlockStop`
    ContentBlockStop,
    /// `messageStop`
    MessageStop {
        /// Why generation ended, e.g. `end_turn`
        stop_reason: Option<String>,
    },
    /// `metadata` (usage and latency)
    Metadata,
    /// Any event this client does not know
    Unknown,
}

/// Transport events in arrival order
pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<StreamEvent, BoxError>> + Send + 'static>>;

/// Remote Converse endpoint
#[async_trait]
pub trait ConverseTransport: Send + Sync {
    /// Issue a blocking request and return the response content blocks
    async fn converse(&self, request: &ConverseRequest) -> Result<Vec<ResponseBlock>, BoxError>;

    /// Open a streaming request.
    ///
    /// `Ok(None)` means the service answered without a stream handle.
    async fn converse_stream(
        &self,
        request: &ConverseRequest,
    ) -> Result<Option<EventStream>, BoxError>;
}

/// Scripted stream outcome for [`ScriptedTransport`]
#[doc(hidden)]
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Answer without a stream handle
    NoStream,
    /// Fail to open with this reason
    OpenError(String),
    /// `Err` entries are raised as transport errors at that position
    Events(Vec<Result<StreamEvent, String>>),
}

/// In-memory transport replaying canned responses
#[doc(hidden)]
pub struct ScriptedTransport {
    blocks: std::result::Result<Vec<ResponseBlock>, String>,
    stream: StreamScript,
    requests: Mutex<Vec<ConverseRequest>>,
    released: Arc<AtomicBool>,
}

impl ScriptedTransport {
    /// Transport whose blocking call returns `blocks`
    pub fn with_blocks(blocks: Vec<ResponseBlock>) -> Self {
        Self::new(Ok(blocks), StreamScript::Events(Vec::new()))
    }

    /// Transport whose blocking call fails with `reason`
    pub fn failing(reason: &str) -> Self {
        Self::new(Err(reason.to_string()), StreamScript::OpenError(reason.to_string()))
    }

    /// Transport whose streaming call follows `script`
    pub fn with_stream(script: StreamScript) -> Self {
        Self::new(Ok(Vec::new()), script)
    }

    fn new(blocks: std::result::Result<Vec<ResponseBlock>, String>, stream: StreamScript) -> Self {
        Self {
            blocks,
            stream,
            requests: Mutex::new(Vec::new()),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ConverseRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Whether the last opened event stream has been dropped
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn record(&self, request: &ConverseRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConverseTransport for ScriptedTransport {
    async fn converse(&self, request: &ConverseRequest) -> Result<Vec<ResponseBlock>, BoxError> {
        self.record(request);
        self.blocks.clone().map_err(BoxError::from)
    }

    async fn converse_stream(
        &self,
        request: &ConverseRequest,
    ) -> Result<Option<EventStream>, BoxError> {
        self.record(request);
        match &self.stream {
            StreamScript::NoStream => Ok(None),
            StreamScript::OpenError(reason) => Err(reason.clone().into()),
            StreamScript::Events(events) => {
                self.released.store(false, Ordering::SeqCst);
                let guard = ReleaseGuard(Arc::clone(&self.released));
                let events = events.clone().into_iter();
                let stream = stream::unfold((events, guard), |(mut events, guard)| async move {
                    events
                        .next()
                        .map(|next| (next.map_err(BoxError::from), (events, guard)))
                });
                Ok(Some(Box::pin(stream)))
            }
        }
    }
}
