//! Conviction Core
//!
//! Foundational error types and the stream event model for the Conviction
//! research engine workspace. This crate has zero dependencies on
//! application-level code (HTTP client, database, advisor backend).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `streaming` - Decoded stream events and frame payload types
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **Closed event unions** - every frame decodes to one variant of one enum,
//!    exhaustively handled by consumers
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{
    AdvisorMetadata, ExchangeClassification, FollowUpOption, FrameError, StreamEvent,
};
