//! Advisor Backend Trait
//!
//! Defines the narrow interface the engine holds against the model backend:
//! open an answer stream, and classify a finished exchange. Keeping this a
//! trait lets every call site share one engine while the backend (and its
//! classifier) stays pluggable and mockable.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use conviction_core::streaming::StreamEvent;

use crate::types::{AdvisorError, AdvisorRequest, AdvisorResult, ClassifiedExchange, StreamOutcome};

/// Trait the model backend boundary must implement.
#[async_trait]
pub trait AdvisorBackend: Send + Sync {
    /// Open an answer stream for the given conversation.
    ///
    /// Decoded events are forwarded over `tx` as they arrive; the returned
    /// [`StreamOutcome`] carries everything accumulated when the stream ends.
    /// Cancelling `cancel` stops the read loop promptly; content accumulated
    /// up to that point is kept, with `completed = false`.
    async fn stream_answer(
        &self,
        request: AdvisorRequest,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> AdvisorResult<StreamOutcome>;

    /// Classify one finished exchange (latest user utterance + full reply).
    ///
    /// Returns `Ok(None)` when the backend's output cannot be parsed as the
    /// expected shape: the classification is dropped entirely, with no retry
    /// and no partial credit.
    async fn classify_exchange(
        &self,
        user_text: &str,
        assistant_text: &str,
    ) -> AdvisorResult<Option<ClassifiedExchange>>;
}

/// Map a non-2xx backend status to the advisor error taxonomy.
///
/// Rate-limit and quota statuses stay distinct so the caller can word them
/// for the user; everything else collapses to a generic server error.
pub fn status_to_error(status: u16, body: &str) -> AdvisorError {
    match status {
        429 => AdvisorError::RateLimited {
            message: body.to_string(),
        },
        402 => AdvisorError::QuotaExhausted {
            message: body.to_string(),
        },
        _ => AdvisorError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
    }
}
