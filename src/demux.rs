//! Splits a Converse event stream into reasoning and answer fragments

use crate::error::{AppError, Result};
use crate::transport::{ConverseRequest, ConverseTransport, EventStream, StreamEvent};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Which text stream a fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// Part of the reasoning trace
    Reasoning,
    /// Part of the visible answer
    Final,
}

/// One classified text delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    /// Stream the text belongs to
    pub kind: FragmentKind,
    /// Delta text, verbatim
    pub text: String,
}

impl Fragment {
    /// Reasoning-trace fragment
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Reasoning,
            text: text.into(),
        }
    }

    /// Visible-answer fragment
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Final,
            text: text.into(),
        }
    }
}

/// Classify a single transport event.
///
/// Reasoning text wins over plain text when a delta carries both. Events that are
/// not content deltas, and deltas with neither field, yield `None`.
pub fn classify(event: StreamEvent) -> Option<Fragment> {
    let StreamEvent::ContentBlockDelta(delta) = event else {
        return None;
    };

    match (delta.reasoning_text, delta.text) {
        (Some(reasoning), _) => Some(Fragment::reasoning(reasoning)),
        (None, Some(text)) => Some(Fragment::final_text(text)),
        (None, None) => None,
    }
}

/// Lazy stream of fragments from one streaming call
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

enum State {
    Pending {
        transport: Arc<dyn ConverseTransport>,
        request: ConverseRequest,
    },
    Streaming {
        events: EventStream,
        model_id: String,
    },
    Done,
}

/// Open `request` on the first poll and demultiplex its events.
///
/// The stream ends after the transport closes or after the first error. Dropping
/// it drops the underlying event stream and with it the connection.
pub fn demultiplex(
    transport: Arc<dyn ConverseTransport>,
    request: ConverseRequest,
) -> FragmentStream {
    let state = State::Pending { transport, request };

    Box::pin(stream::unfold(state, |state| async move {
        match state {
            State::Pending { transport, request } => {
                let model_id = request.model_id.clone();
                match transport.converse_stream(&request).await {
                    Ok(Some(events)) => {
                        debug!(model_id = %model_id, "Stream opened");
                        next_fragment(events, model_id).await
                    }
                    Ok(None) => {
                        Some((Err(AppError::StreamUnavailable { model_id }), State::Done))
                    }
                    Err(reason) => {
                        Some((Err(AppError::invocation(&model_id, reason)), State::Done))
                    }
                }
            }
            State::Streaming { events, model_id } => next_fragment(events, model_id).await,
            State::Done => None,
        }
    }))
}

async fn next_fragment(
    mut events: EventStream,
    model_id: String,
) -> Option<(Result<Fragment>, State)> {
    loop {
        match events.next().await {
            Some(Ok(event)) => {
                if let Some(fragment) = classify(event) {
                    return Some((Ok(fragment), State::Streaming { events, model_id }));
                }
            }
            Some(Err(reason)) => {
                debug!(model_id = %model_id, "Stream failed: {}", reason);
                return Some((Err(AppError::invocation(&model_id, reason)), State::Done));
            }
            None => {
                debug!(model_id = %model_id, "Stream closed");
                return None;
            }
        }
    }
}

/// Running totals of both text streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulated {
    /// Concatenated reasoning fragments
    pub reasoning: String,
    /// Concatenated answer fragments
    pub answer: String,
}

impl Accumulated {
    /// Append a fragment to the buffer for its kind
    pub fn push(&mut self, fragment: &Fragment) {
        match fragment.kind {
            FragmentKind::Reasoning => self.reasoning.push_str(&fragment.text),
            FragmentKind::Final => self.answer.push_str(&fragment.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, InferenceParams};
    use crate::transport::{Delta, ScriptedTransport, StreamScript};

    #[test]
    fn reasoning_delta_is_reasoning() {
        let fragment = classify(StreamEvent::ContentBlockDelta(Delta::reasoning("hmm")));
        assert_eq!(fragment, Some(Fragment::reasoning("hmm")));
    }

    #[test]
    fn text_delta_is_final() {
        let fragment = classify(StreamEvent::ContentBlockDelta(Delta::text("42")));
        assert_eq!(fragment, Some(Fragment::final_text("42")));
    }

    #[test]
    fn reasoning_takes_precedence() {
        let delta = Delta {
            text: Some("answer".to_string()),
            reasoning_text: Some("thought".to_string()),
        };
        assert_eq!(
            classify(StreamEvent::ContentBlockDelta(delta)),
            Some(Fragment::reasoning("thought"))
        );
    }

    #[test]
    fn non_delta_events_are_ignored() {
        for event in [
            StreamEvent::MessageStart,
            StreamEvent::ContentBlockStart,
            StreamEvent::ContentBlockStop,
            StreamEvent::MessageStop { stop_reason: Some("end_turn".to_string()) },
            StreamEvent::Metadata,
            StreamEvent::Unknown,
        ] {
            assert_eq!(classify(event), None);
        }
    }

    #[test]
    fn unknown_delta_shape_is_dropped() {
        assert_eq!(classify(StreamEvent::ContentBlockDelta(Delta::default())), None);
    }

    #[test]
    fn accumulates_by_kind() {
        let mut acc = Accumulated::default();
        for fragment in [
            Fragment::reasoning("a"),
            Fragment::final_text("x"),
            Fragment::reasoning("b"),
        ] {
            acc.push(&fragment);
        }
        assert_eq!(acc.reasoning, "ab");
        assert_eq!(acc.answer, "x");
    }

    #[test]
    fn demultiplex_skips_lifecycle_events() {
        let transport = Arc::new(ScriptedTransport::with_stream(StreamScript::Events(vec![
            Ok(StreamEvent::MessageStart),
            Ok(StreamEvent::ContentBlockDelta(Delta::text("hi"))),
            Ok(StreamEvent::MessageStop { stop_reason: None }),
        ])));
        let conversation = Conversation::new("q", None).unwrap();
        let request = ConverseRequest::new("m", &conversation, &InferenceParams::default());

        let items: Vec<Result<Fragment>> =
            tokio_test::block_on(demultiplex(transport, request).collect());

        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Ok(fragment) if fragment.text == "hi"));
    }
}
