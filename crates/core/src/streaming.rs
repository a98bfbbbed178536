//! Stream Event Model
//!
//! Application-level events reconstructed from the advisor's chunked answer
//! stream. The wire protocol delivers newline-delimited frames; the decoder
//! in the advisor crate turns each complete frame into exactly one
//! [`StreamEvent`] variant, and consumers (the conversation orchestrator,
//! the transcript) handle the union exhaustively.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A clickable follow-up action suggested by the advisor.
///
/// The wire shape carries a display label, an action tag in its `type` field,
/// and arbitrary action parameters alongside (e.g. a ticker symbol). The
/// parameters are kept free-form: the engine attaches them to the assistant
/// turn and leaves interpretation to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpOption {
    /// Display label for the option
    pub label: String,
    /// Action tag (the wire `type` field)
    #[serde(rename = "type")]
    pub action: String,
    /// Free-form action parameters
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

/// A single (section, subsection, summary) label produced by the exchange
/// classifier for one conversational exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeClassification {
    pub category: String,
    pub subcategory: String,
    pub summary: String,
}

/// Out-of-band metadata delivered inside the answer stream.
///
/// Both fields are optional; a metadata frame may carry either, both, or
/// neither (in which case it is a no-op).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdvisorMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ExchangeClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_questions: Option<Vec<String>>,
}

/// One decoded frame from the advisor's answer stream.
///
/// Closed union: every frame that survives decoding maps to exactly one of
/// these variants. `Unrecognized` covers structurally valid payloads whose
/// discriminator the engine does not know; consumers treat it as a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental fragment of the assistant's generated text
    ContentDelta { text: String },

    /// Follow-up options to attach to the most recent assistant turn,
    /// without altering its accumulated text
    FollowUps { options: Vec<FollowUpOption> },

    /// Out-of-band classification metadata and/or suggested questions
    Metadata { metadata: AdvisorMetadata },

    /// The stream is logically complete; later frames carry no content
    Terminal,

    /// Structurally valid payload with an unknown discriminator
    Unrecognized,
}

impl StreamEvent {
    /// Returns true for events that mutate the visible transcript.
    pub fn touches_transcript(&self) -> bool {
        matches!(
            self,
            StreamEvent::ContentDelta { .. } | StreamEvent::FollowUps { .. }
        )
    }
}

/// Errors that can occur while decoding a frame payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FrameError {
    /// Payload could not be parsed as a structured frame
    Parse(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FrameError {}
