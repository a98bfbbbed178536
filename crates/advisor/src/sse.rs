//! SSE Frame Decoding
//!
//! Turns the advisor's chunked byte stream into complete logical frames and
//! classifies each frame payload into a [`StreamEvent`]. Chunk boundaries
//! carry no meaning: a chunk may end mid-delimiter, mid-prefix, or inside a
//! multi-byte UTF-8 character, so the decoder accumulates raw bytes and only
//! decodes text once a full line is available. `\n` is a single byte that
//! never appears inside a multi-byte scalar, which makes byte-level line
//! splitting safe.
//!
//! Payloads that fail to parse are not errors: the generated text may itself
//! contain a newline that split one logical payload across two frames. The
//! decoder holds such a payload in an explicit pending-malformed state and
//! joins subsequent lines back onto it (restoring the delimiter) until the
//! payload parses, a fresh data frame arrives, or the repair budget runs out.

use conviction_core::streaming::{
    AdvisorMetadata, ExchangeClassification, FollowUpOption, FrameError, StreamEvent,
};
use serde::Deserialize;

/// Prefix of meaningful data frames
const DATA_PREFIX: &str = "data: ";

/// Terminal sentinel payload
const DONE_SENTINEL: &str = "[DONE]";

/// Comment marker; frames starting with this are discarded
const COMMENT_MARKER: char = ':';

/// How many joined lines a pending malformed payload may consume before it
/// is dropped. Bounds the repair loop so it can never run forever.
const MAX_REPAIR_ATTEMPTS: u32 = 3;

/// Wire shape of a structured frame payload.
///
/// One deserialization target covers all three payload shapes; the
/// discriminator logic in [`classify_payload`] picks the variant.
#[derive(Debug, Deserialize)]
struct FramePayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    options: Option<Vec<FollowUpOption>>,
    #[serde(default)]
    classification: Option<ExchangeClassification>,
    #[serde(default)]
    suggested_questions: Option<Vec<String>>,
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Classify one complete frame payload (the text after the data prefix).
///
/// - the terminal sentinel maps to [`StreamEvent::Terminal`];
/// - a `type` discriminator of `follow_ups` or `advisor_metadata` maps to
///   the corresponding variant; any other discriminator is
///   [`StreamEvent::Unrecognized`];
/// - no discriminator plus a `choices[0].delta.content` string is a
///   content delta; no discriminator and no content is unrecognized;
/// - anything that does not parse as JSON is a [`FrameError::Parse`], which
///   callers treat as a possibly-split payload rather than a failure.
pub fn classify_payload(payload: &str) -> Result<StreamEvent, FrameError> {
    if payload == DONE_SENTINEL {
        return Ok(StreamEvent::Terminal);
    }

    let frame: FramePayload =
        serde_json::from_str(payload).map_err(|e| FrameError::Parse(e.to_string()))?;

    match frame.kind.as_deref() {
        Some("follow_ups") => Ok(StreamEvent::FollowUps {
            options: frame.options.unwrap_or_default(),
        }),
        Some("advisor_metadata") => Ok(StreamEvent::Metadata {
            metadata: AdvisorMetadata {
                classification: frame.classification,
                suggested_questions: frame.suggested_questions,
            },
        }),
        Some(_) => Ok(StreamEvent::Unrecognized),
        None => {
            let content = frame
                .choices
                .and_then(|mut choices| {
                    if choices.is_empty() {
                        None
                    } else {
                        choices.swap_remove(0).delta
                    }
                })
                .and_then(|delta| delta.content);

            match content {
                Some(text) => Ok(StreamEvent::ContentDelta { text }),
                None => Ok(StreamEvent::Unrecognized),
            }
        }
    }
}

/// A payload that failed to parse and is waiting for its continuation lines.
#[derive(Debug)]
struct PendingMalformed {
    partial: String,
    attempts: u32,
}

/// Stateful decoder from transport bytes to stream events.
///
/// Feed arbitrary byte fragments with [`FrameDecoder::feed`]; call
/// [`FrameDecoder::finish`] when the transport ends. Guarantees:
///
/// - partial frames are never emitted; they stay buffered until their
///   delimiter arrives or the stream ends (then they are discarded);
/// - no byte is dropped except delimiters and one trailing `\r` per frame;
/// - splitting the same byte sequence at any offsets yields the same events.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    pending: Option<PendingMalformed>,
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the terminal marker has been seen. Later bytes are still
    /// consumed (the transport may keep draining) but produce no events.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Append a transport chunk and emit every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the delimiter itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            // A complete line contains only complete characters: multi-byte
            // scalars cannot span a `\n` byte.
            let text = String::from_utf8_lossy(&line).into_owned();
            self.process_line(&text, &mut events);
        }
        events
    }

    /// Signal end of transport. A trailing partial frame and any pending
    /// malformed payload are discarded, never guessed at.
    pub fn finish(&mut self) {
        if !self.buf.is_empty() {
            tracing::debug!(
                bytes = self.buf.len(),
                "discarding trailing partial frame at stream end"
            );
            self.buf.clear();
        }
        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                attempts = pending.attempts,
                "discarding unrepaired malformed frame at stream end"
            );
        }
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        if self.finished {
            return;
        }

        if let Some(pending) = self.pending.take() {
            self.repair_line(pending, line, events);
            return;
        }

        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            return;
        }
        let payload = match line.strip_prefix(DATA_PREFIX) {
            Some(rest) => rest,
            // Alternate frame kinds (event:, id:, retry:) are not ours.
            None => return,
        };

        match classify_payload(payload) {
            Ok(event) => self.emit(event, events),
            Err(err) => {
                tracing::debug!(%err, "frame payload incomplete, holding for repair");
                self.pending = Some(PendingMalformed {
                    partial: payload.to_string(),
                    attempts: 0,
                });
            }
        }
    }

    /// Try to complete a pending malformed payload with the next line.
    ///
    /// The line is raw payload continuation (the embedded newline sat inside
    /// the JSON, after the prefix), so it is joined without prefix stripping.
    /// If the join still fails and the line is itself a well-formed data
    /// frame, the pending payload is abandoned in its favor.
    fn repair_line(&mut self, pending: PendingMalformed, line: &str, events: &mut Vec<StreamEvent>) {
        let joined = format!("{}\n{}", pending.partial, line);
        match classify_payload(&joined) {
            Ok(event) => {
                self.emit(event, events);
            }
            Err(_) => {
                if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                    if let Ok(event) = classify_payload(payload) {
                        tracing::debug!("abandoning malformed frame for a fresh data frame");
                        self.emit(event, events);
                        return;
                    }
                }
                let attempts = pending.attempts + 1;
                if attempts >= MAX_REPAIR_ATTEMPTS {
                    tracing::debug!(attempts, "malformed frame exceeded repair budget, dropped");
                } else {
                    self.pending = Some(PendingMalformed {
                        partial: joined,
                        attempts,
                    });
                }
            }
        }
    }

    fn emit(&mut self, event: StreamEvent, events: &mut Vec<StreamEvent>) {
        match event {
            StreamEvent::Unrecognized => {}
            StreamEvent::Terminal => {
                self.finished = true;
                events.push(StreamEvent::Terminal);
            }
            other => events.push(other),
        }
    }
}
