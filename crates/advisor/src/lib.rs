//! Conviction Advisor
//!
//! The model-backend boundary of the research engine:
//!
//! - the request contract and generation configuration
//! - the SSE frame decoder (chunked bytes -> complete frames -> events)
//! - the [`AdvisorBackend`] trait and its HTTP implementation
//! - the post-stream exchange classification round-trip

pub mod backend;
pub mod client;
pub mod http_client;
pub mod sse;
pub mod types;

// Re-export main types
pub use backend::{status_to_error, AdvisorBackend};
pub use client::HttpAdvisor;
pub use http_client::build_http_client;
pub use sse::{classify_payload, FrameDecoder};
pub use types::*;
