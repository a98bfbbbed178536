//! Data models

pub mod conversation;

pub use conversation::{ConversationTurn, Transcript};
