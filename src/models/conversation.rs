//! Conversation Transcript
//!
//! The ordered sequence of turns for one research conversation. Turns are
//! immutable once appended, with two exceptions scoped to the open assistant
//! turn: streamed content deltas extend its text, and follow-up options can
//! be attached to it without touching that text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conviction_advisor::{ChatRole, ChatTurn};
use conviction_core::streaming::FollowUpOption;

/// Maximum length for transcript previews
const PREVIEW_MAX_LEN: usize = 100;

/// One turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Follow-up options attached to this turn (assistant turns only; at
    /// most the latest assistant turn carries any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<FollowUpOption>,
}

impl ConversationTurn {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
            follow_ups: Vec::new(),
        }
    }
}

/// The per-conversation transcript
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a user turn
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::new(ChatRole::User, text));
    }

    /// Open a new, empty assistant turn for streaming
    pub fn begin_assistant(&mut self) {
        self.turns
            .push(ConversationTurn::new(ChatRole::Assistant, ""));
    }

    /// Append a full assistant turn at once (e.g. a confirmation message)
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns
            .push(ConversationTurn::new(ChatRole::Assistant, text));
    }

    /// Append a content delta to the open assistant turn.
    ///
    /// No-op when the latest turn is not an assistant turn; deltas arriving
    /// for a turn that was never opened have nowhere to go.
    pub fn append_delta(&mut self, text: &str) {
        if let Some(turn) = self.turns.last_mut() {
            if turn.role == ChatRole::Assistant {
                turn.text.push_str(text);
            }
        }
    }

    /// Attach follow-up options to the most recent assistant turn without
    /// altering its text. Earlier turns lose theirs: at most one turn
    /// carries options at a time.
    pub fn attach_follow_ups(&mut self, options: Vec<FollowUpOption>) {
        for turn in self.turns.iter_mut() {
            turn.follow_ups.clear();
        }
        if let Some(turn) = self
            .turns
            .iter_mut()
            .rev()
            .find(|t| t.role == ChatRole::Assistant)
        {
            turn.follow_ups = options;
        }
    }

    /// Drop a trailing assistant turn that never received content or
    /// follow-ups (e.g. the stream failed before anything arrived).
    pub fn discard_empty_assistant(&mut self) {
        if let Some(turn) = self.turns.last() {
            if turn.role == ChatRole::Assistant && turn.text.is_empty() && turn.follow_ups.is_empty()
            {
                self.turns.pop();
            }
        }
    }

    /// Text of the most recent assistant turn
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == ChatRole::Assistant)
            .map(|t| t.text.as_str())
    }

    /// Truncated first-user-message preview for conversation lists
    pub fn preview(&self) -> Option<String> {
        let first = self
            .turns
            .iter()
            .find(|t| t.role == ChatRole::User)
            .map(|t| t.text.as_str())?;
        if first.is_empty() {
            return None;
        }
        let preview = if first.chars().count() > PREVIEW_MAX_LEN {
            let truncated: String = first.chars().take(PREVIEW_MAX_LEN).collect();
            format!("{}...", truncated)
        } else {
            first.to_string()
        };
        Some(preview.replace('\n', " ").trim().to_string())
    }

    /// Project the transcript into the advisor request contract
    pub fn to_chat_turns(&self) -> Vec<ChatTurn> {
        self.turns
            .iter()
            .map(|t| ChatTurn {
                role: t.role,
                text: t.text.clone(),
            })
            .collect()
    }
}
