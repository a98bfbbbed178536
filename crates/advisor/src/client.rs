//! HTTP Advisor Client
//!
//! Implementation of [`AdvisorBackend`] against the advisor service's
//! chat-completion endpoint. One strictly sequential read loop per stream:
//! each iteration waits for the next transport chunk (or cancellation),
//! pushes it through the frame decoder, and forwards the resulting events.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use conviction_core::streaming::StreamEvent;

use crate::backend::{status_to_error, AdvisorBackend};
use crate::http_client::build_http_client;
use crate::sse::FrameDecoder;
use crate::types::{
    AdvisorError, AdvisorRequest, AdvisorResult, ChatTurn, ClassifiedExchange, GenerationConfig,
    StreamOutcome,
};

/// Default advisor service endpoint
const ADVISOR_API_URL: &str = "https://advisor.conviction.app/v1/chat";

/// Cap on suggested questions accepted from one classification
const MAX_SUGGESTED_QUESTIONS: usize = 3;

/// HTTP client for the advisor service
pub struct HttpAdvisor {
    config: GenerationConfig,
    client: reqwest::Client,
}

impl HttpAdvisor {
    /// Create a new advisor client with the given configuration
    pub fn new(config: GenerationConfig) -> Self {
        let client = build_http_client();
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ADVISOR_API_URL)
    }

    /// Build the request body for the chat endpoint
    fn build_request_body(&self, request: &AdvisorRequest, stream: bool) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .turns
            .iter()
            .map(|turn| {
                serde_json::json!({
                    "role": turn.role.to_string(),
                    "content": turn.text,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": stream,
            "messages": messages,
        });

        if let Some(subject_id) = &request.subject_id {
            body["subject_id"] = serde_json::json!(subject_id);
        }
        if let Some(subject_name) = &request.subject_name {
            body["subject_name"] = serde_json::json!(subject_name);
        }
        if let Some(snapshot) = &request.progress_snapshot {
            body["research_progress"] = snapshot.clone();
        }

        body
    }

    async fn post(&self, body: &serde_json::Value) -> AdvisorResult<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.base_url())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| AdvisorError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl AdvisorBackend for HttpAdvisor {
    async fn stream_answer(
        &self,
        request: AdvisorRequest,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> AdvisorResult<StreamOutcome> {
        let body = self.build_request_body(&request, true);
        let response = self.post(&body).await?;

        let mut decoder = FrameDecoder::new();
        let mut outcome = StreamOutcome::default();
        let mut stream = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("answer stream cancelled by caller");
                    break;
                }
                next = stream.next() => match next {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        return Err(AdvisorError::NetworkError {
                            message: e.to_string(),
                        })
                    }
                    // Transport ended. Without a terminal marker this is an
                    // interrupted reply: keep what accumulated.
                    None => break,
                },
            };

            for event in decoder.feed(&chunk) {
                match &event {
                    StreamEvent::ContentDelta { text } => outcome.content.push_str(text),
                    StreamEvent::FollowUps { options } => {
                        outcome.follow_ups = options.clone();
                    }
                    StreamEvent::Metadata { metadata } => {
                        outcome.metadata = Some(metadata.clone());
                    }
                    StreamEvent::Terminal => outcome.completed = true,
                    StreamEvent::Unrecognized => {}
                }
                // A dropped receiver means nobody is watching the transcript
                // anymore; accumulation continues regardless.
                let _ = tx.send(event).await;
            }
        }
        decoder.finish();

        Ok(outcome)
    }

    async fn classify_exchange(
        &self,
        user_text: &str,
        assistant_text: &str,
    ) -> AdvisorResult<Option<ClassifiedExchange>> {
        let request = AdvisorRequest {
            turns: vec![
                ChatTurn::user(user_text),
                ChatTurn::assistant(assistant_text),
            ],
            ..Default::default()
        };
        let mut body = self.build_request_body(&request, false);
        body["mode"] = serde_json::json!("classify_exchange");

        let response = self.post(&body).await?;
        let body_text = response.text().await.map_err(|e| AdvisorError::NetworkError {
            message: e.to_string(),
        })?;

        let parsed: ClassifyResponse =
            serde_json::from_str(&body_text).map_err(|e| AdvisorError::ParseError {
                message: format!("Failed to parse classify response: {}", e),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);

        let content = match content {
            Some(text) => text,
            None => {
                tracing::debug!("classify response carried no content, dropping classification");
                return Ok(None);
            }
        };

        // The model's output is itself JSON. If it is not the expected
        // shape, the whole classification is dropped: the conversational
        // turn stands on its own.
        match serde_json::from_str::<ClassifiedExchange>(&content) {
            Ok(mut exchange) => {
                exchange.suggested_questions.truncate(MAX_SUGGESTED_QUESTIONS);
                Ok(Some(exchange))
            }
            Err(e) => {
                tracing::debug!(error = %e, "unparseable classifier output, dropping");
                Ok(None)
            }
        }
    }
}

/// Classify endpoint response format
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    choices: Vec<ClassifyChoice>,
}

#[derive(Debug, Deserialize)]
struct ClassifyChoice {
    message: Option<ClassifyMessage>,
}

#[derive(Debug, Deserialize)]
struct ClassifyMessage {
    content: Option<String>,
}
