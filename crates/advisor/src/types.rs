//! Advisor Types
//!
//! Request contract, generation configuration, and error taxonomy for the
//! advisor backend boundary.

use conviction_core::streaming::{AdvisorMetadata, ExchangeClassification, FollowUpOption};
use serde::{Deserialize, Serialize};

/// Role of a conversation turn as submitted to the advisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One prior turn in the conversation history submitted with a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Configuration for the advisor backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API key for the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name to use
    pub model: String,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "advisor-chat-1".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// What the caller must supply to originate an answer stream.
///
/// The progress snapshot gives the backend context for its in-stream
/// classification metadata; it is never mutated by the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorRequest {
    /// Ordered conversation history, oldest first
    pub turns: Vec<ChatTurn>,
    /// Subject (ticker or topic) identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    /// Subject display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    /// Serialized research-progress snapshot for the (user, subject) pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_snapshot: Option<serde_json::Value>,
}

/// Everything accumulated from one answer stream.
#[derive(Debug, Clone, Default)]
pub struct StreamOutcome {
    /// Full assistant reply text (possibly partial if the transport dropped)
    pub content: String,
    /// Follow-up options attached to the reply, if any were streamed
    pub follow_ups: Vec<FollowUpOption>,
    /// Out-of-band metadata, if a metadata frame arrived
    pub metadata: Option<AdvisorMetadata>,
    /// True iff the terminal marker was seen before the transport ended
    pub completed: bool,
}

/// Result of the post-stream exchange classification round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifiedExchange {
    /// At most one (section, subsection, summary) label for the exchange
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ExchangeClassification>,
    /// Up to three suggested follow-up questions
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Error types for advisor operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdvisorError {
    /// The backend refused the request with a rate-limit status
    RateLimited { message: String },
    /// The backend refused the request with a quota/payment status
    QuotaExhausted { message: String },
    /// Network/connection error
    NetworkError { message: String },
    /// Server error from the backend
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Response parsing error
    ParseError { message: String },
    /// Other error
    Other { message: String },
}

impl std::fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvisorError::RateLimited { message } => {
                write!(f, "Rate limited: {}", message)
            }
            AdvisorError::QuotaExhausted { message } => {
                write!(f, "Quota exhausted: {}", message)
            }
            AdvisorError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            AdvisorError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            AdvisorError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            AdvisorError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for AdvisorError {}

/// Result type for advisor operations
pub type AdvisorResult<T> = Result<T, AdvisorError>;
