//! Deepseek-R1 on AWS Bedrock - blocking and streaming Converse client
//! that keeps the model's reasoning apart from its answer

pub mod api;
pub mod bedrock;
pub mod chat;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod demux;
pub mod error;
pub mod session;
pub mod transport;
pub mod ui;

pub use api::{BedrockClient, ModelResponse};
pub use conversation::{Conversation, InferenceParams};
pub use demux::{Fragment, FragmentKind};
pub use error::{AppError, Result};
