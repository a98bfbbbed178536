//! Scripted advisor backend for integration tests.
//!
//! Replies are canned SSE byte chunks pushed through the real
//! [`FrameDecoder`], so these tests exercise the same decode path as the
//! HTTP client.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use conviction_advisor::{
    AdvisorBackend, AdvisorError, AdvisorRequest, AdvisorResult, ClassifiedExchange, FrameDecoder,
    StreamOutcome,
};
use conviction_core::streaming::StreamEvent;

/// One canned reply: SSE chunks plus the classification the backend would
/// produce for the exchange.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReply {
    pub chunks: Vec<Vec<u8>>,
    pub classification: Option<ClassifiedExchange>,
    /// After feeding this chunk index, the stream parks until the caller
    /// cancels. Lets tests close a session mid-stream deterministically.
    pub wait_for_cancel_after: Option<usize>,
}

impl ScriptedReply {
    /// A completed reply: one content frame followed by the terminal frame
    pub fn text(text: &str) -> Self {
        let payload = serde_json::json!({
            "choices": [{"delta": {"content": text}}]
        });
        Self {
            chunks: vec![
                format!("data: {}\n", payload).into_bytes(),
                b"data: [DONE]\n".to_vec(),
            ],
            ..Default::default()
        }
    }

    pub fn with_classification(mut self, category: &str, subcategory: &str, summary: &str) -> Self {
        self.classification = Some(ClassifiedExchange {
            classification: Some(conviction_core::streaming::ExchangeClassification {
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                summary: summary.to_string(),
            }),
            suggested_questions: Vec::new(),
        });
        self
    }
}

/// Advisor backend that replays scripted replies in order.
#[derive(Default)]
pub struct ScriptedAdvisor {
    replies: Mutex<VecDeque<ScriptedReply>>,
    /// Classification held for the round-trip after the current stream
    next_classification: Mutex<Option<ClassifiedExchange>>,
    /// Error returned instead of opening a stream, once set
    pub fail_with: Mutex<Option<AdvisorError>>,
    pub classify_calls: AtomicUsize,
}

impl ScriptedAdvisor {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AdvisorBackend for ScriptedAdvisor {
    async fn stream_answer(
        &self,
        _request: AdvisorRequest,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> AdvisorResult<StreamOutcome> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::text("scripted fallback"));

        let mut decoder = FrameDecoder::new();
        let mut outcome = StreamOutcome::default();
        for (i, chunk) in reply.chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            for event in decoder.feed(chunk) {
                match &event {
                    StreamEvent::ContentDelta { text } => outcome.content.push_str(text),
                    StreamEvent::FollowUps { options } => outcome.follow_ups = options.clone(),
                    StreamEvent::Metadata { metadata } => outcome.metadata = Some(metadata.clone()),
                    StreamEvent::Terminal => outcome.completed = true,
                    StreamEvent::Unrecognized => {}
                }
                let _ = tx.send(event).await;
            }
            if reply.wait_for_cancel_after == Some(i) {
                cancel.cancelled().await;
            }
        }
        decoder.finish();

        // Stash the classification for the follow-up round-trip.
        *self.next_classification.lock().unwrap() = reply.classification;
        Ok(outcome)
    }

    async fn classify_exchange(
        &self,
        _user_text: &str,
        _assistant_text: &str,
    ) -> AdvisorResult<Option<ClassifiedExchange>> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_classification.lock().unwrap().take())
    }
}
