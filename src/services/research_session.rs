//! Research Session Orchestration
//!
//! Wires the advisor stream, the transcript, and the progress model together
//! for one conversation. One strictly sequential flow per session: stream
//! the reply, then (only if the stream completed) run the exchange
//! classifier and fold its label into the persisted progress record.
//!
//! Every read-modify-write of the (user, subject) progress or milestone
//! record happens under that key's lock, so two concurrent conversations
//! about the same subject cannot silently drop each other's increments.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use conviction_advisor::{AdvisorBackend, AdvisorRequest, ClassifiedExchange, StreamOutcome};
use conviction_core::streaming::{FollowUpOption, StreamEvent};
use conviction_research::{
    CellKey, MilestoneDetector, ProgressConfig, ProgressEvent, ProgressRecord, Taxonomy,
    ThesisStance,
};

use crate::models::Transcript;
use crate::services::thesis::{FinalizedThesis, ThesisService};
use crate::storage::Database;
use crate::utils::error::{AppError, AppResult};
use crate::utils::keyed_lock::KeyedLocks;

/// Event channel depth between the stream loop and the transcript applier
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What one exchange produced, beyond the transcript itself.
#[derive(Debug, Clone, Default)]
pub struct ExchangeOutcome {
    /// The assistant's reply text (possibly partial on transport loss)
    pub reply: String,
    /// True iff the stream reached its terminal marker
    pub completed: bool,
    /// Follow-up options attached to the reply
    pub follow_ups: Vec<FollowUpOption>,
    /// Suggested next questions, from stream metadata or the classifier
    pub suggested_questions: Vec<String>,
    /// Whether this exchange advanced the progress record
    pub progress_updated: bool,
    /// Whether this exchange flipped any milestone flag
    pub milestones_updated: bool,
    /// Overall completion after the exchange, in [0, 100]
    pub overall_completion: f64,
    /// Whether thesis finalization is unlocked
    pub unlocked: bool,
}

/// Shared engine state: one per process, sessions are cheap handles.
pub struct ResearchEngine {
    backend: Arc<dyn AdvisorBackend>,
    db: Database,
    taxonomy: Taxonomy,
    progress_config: ProgressConfig,
    detector: MilestoneDetector,
    locks: KeyedLocks,
    thesis: ThesisService,
}

impl ResearchEngine {
    /// Create an engine with the default taxonomy and progress thresholds
    pub fn new(backend: Arc<dyn AdvisorBackend>, db: Database) -> Self {
        Self::with_config(backend, db, Taxonomy::default(), ProgressConfig::default())
    }

    /// Create an engine with a custom taxonomy and thresholds
    pub fn with_config(
        backend: Arc<dyn AdvisorBackend>,
        db: Database,
        taxonomy: Taxonomy,
        progress_config: ProgressConfig,
    ) -> Self {
        let thesis = ThesisService::new(db.clone(), taxonomy.clone(), progress_config.clone());
        Self {
            backend,
            db,
            taxonomy,
            progress_config,
            detector: MilestoneDetector::new(),
            locks: KeyedLocks::new(),
            thesis,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn thesis(&self) -> &ThesisService {
        &self.thesis
    }

    /// Open a session handle for one conversation
    pub fn open_session(
        self: &Arc<Self>,
        user_id: impl Into<String>,
        subject_id: impl Into<String>,
        subject_name: Option<String>,
    ) -> ResearchSession {
        ResearchSession {
            engine: Arc::clone(self),
            user_id: user_id.into(),
            subject_id: subject_id.into(),
            subject_name,
            transcript: Arc::new(RwLock::new(Transcript::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Current progress record for a (user, subject) pair, empty if none
    pub fn progress(&self, user_id: &str, subject_id: &str) -> AppResult<ProgressRecord> {
        Ok(self.db.get_progress(user_id, subject_id)?.unwrap_or_default())
    }

    /// Run the milestone detector over one utterance and persist on change.
    ///
    /// Returns true iff a flag flipped. The detector signals no-change with
    /// `None`, which skips the write entirely.
    async fn record_milestones(
        &self,
        user_id: &str,
        subject_id: &str,
        utterance: &str,
    ) -> AppResult<bool> {
        let lock = self.locks.lock_for(user_id, subject_id);
        let _guard = lock.lock().await;

        let current = self
            .db
            .get_milestones(user_id, subject_id)?
            .unwrap_or_default();
        match self.detector.detect(&current, utterance) {
            Some(updated) => {
                self.db.upsert_milestones(user_id, subject_id, &updated)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fold one classified exchange into the persisted progress record.
    async fn record_classified_exchange(
        &self,
        user_id: &str,
        subject_id: &str,
        cell: &CellKey,
        summary: Option<String>,
    ) -> AppResult<ProgressRecord> {
        let lock = self.locks.lock_for(user_id, subject_id);
        let _guard = lock.lock().await;

        let current = self
            .db
            .get_progress(user_id, subject_id)?
            .unwrap_or_default();
        let updated = current.apply(&ProgressEvent::QuestionRecorded {
            section: cell.section,
            subsection: cell.subsection.clone(),
            summary,
        });
        self.db.upsert_progress(user_id, subject_id, &updated)?;
        Ok(updated)
    }
}

/// One conversation between a user and the advisor about one subject.
pub struct ResearchSession {
    engine: Arc<ResearchEngine>,
    user_id: String,
    subject_id: String,
    subject_name: Option<String>,
    transcript: Arc<RwLock<Transcript>>,
    cancel: CancellationToken,
}

impl ResearchSession {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Close the conversation. The read loop stops promptly and no further
    /// content reaches the transcript; a classification already in flight
    /// may still update the durable progress record.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Snapshot of the transcript turns
    pub async fn transcript(&self) -> Transcript {
        self.transcript.read().await.clone()
    }

    /// Send one user message and stream the advisor's reply.
    ///
    /// Returns when the stream has ended and any classification has been
    /// folded into progress. Rate-limit and quota conditions surface as
    /// `AppError::Advisor` before any content arrives.
    pub async fn send_message(&self, text: &str) -> AppResult<ExchangeOutcome> {
        if self.is_closed() {
            return Err(AppError::validation("conversation is closed"));
        }

        let engine = &self.engine;
        let milestones_updated = engine
            .record_milestones(&self.user_id, &self.subject_id, text)
            .await?;

        // Build the request from the transcript as of this user turn; the
        // progress snapshot rides along as classifier context only.
        let request = {
            let mut transcript = self.transcript.write().await;
            transcript.push_user(text);
            let progress = engine.progress(&self.user_id, &self.subject_id)?;
            AdvisorRequest {
                turns: transcript.to_chat_turns(),
                subject_id: Some(self.subject_id.clone()),
                subject_name: self.subject_name.clone(),
                progress_snapshot: Some(serde_json::to_value(&progress)?),
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let applier = self.spawn_transcript_applier(rx);

        let streamed = engine
            .backend
            .stream_answer(request, tx, self.cancel.clone())
            .await;
        // The sender is gone either way; let the applier drain and stop.
        let _ = applier.await;

        let streamed = match streamed {
            Ok(outcome) => outcome,
            Err(err) => {
                self.transcript.write().await.discard_empty_assistant();
                return Err(err.into());
            }
        };

        let mut outcome = ExchangeOutcome {
            reply: streamed.content.clone(),
            completed: streamed.completed,
            follow_ups: streamed.follow_ups.clone(),
            milestones_updated,
            ..Default::default()
        };

        // Classification only applies to a fully received reply.
        if streamed.completed {
            let exchange = self.classification_for(text, &streamed).await;
            if let Some(exchange) = exchange {
                outcome.suggested_questions = exchange.suggested_questions;
                if let Some(c) = exchange.classification {
                    match engine.taxonomy.resolve(&c.category, &c.subcategory) {
                        Some(cell) => {
                            engine
                                .record_classified_exchange(
                                    &self.user_id,
                                    &self.subject_id,
                                    &cell,
                                    Some(c.summary),
                                )
                                .await?;
                            outcome.progress_updated = true;
                        }
                        None => {
                            tracing::debug!(
                                category = %c.category,
                                subcategory = %c.subcategory,
                                "classifier label outside taxonomy, dropped"
                            );
                        }
                    }
                }
            }
        }

        let progress = engine.progress(&self.user_id, &self.subject_id)?;
        outcome.overall_completion =
            progress.overall_completion(&engine.taxonomy, &engine.progress_config);
        outcome.unlocked = progress.is_unlocked(&engine.taxonomy, &engine.progress_config);

        Ok(outcome)
    }

    /// Commit a thesis stance and append a confirmation turn.
    pub async fn finalize_thesis(
        &self,
        stance: ThesisStance,
        custom_text: Option<&str>,
    ) -> AppResult<FinalizedThesis> {
        let finalized = self
            .engine
            .thesis
            .finalize(&self.user_id, &self.subject_id, stance, custom_text)?;

        if !self.is_closed() {
            let subject = self
                .subject_name
                .as_deref()
                .unwrap_or(self.subject_id.as_str());
            self.transcript.write().await.push_assistant(format!(
                "Your {} thesis for {} is saved. You can revisit it anytime as your research evolves.",
                finalized.record.stance, subject
            ));
        }

        Ok(finalized)
    }

    /// Apply streamed events to the transcript until the channel closes.
    ///
    /// Runs next to the read loop so rendering sees each delta as it
    /// arrives. Once the session is closed, events are drained without
    /// touching the transcript.
    fn spawn_transcript_applier(
        &self,
        mut rx: mpsc::Receiver<StreamEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let transcript = Arc::clone(&self.transcript);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut opened = false;
            while let Some(event) = rx.recv().await {
                if cancel.is_cancelled() || !event.touches_transcript() {
                    continue;
                }
                let mut transcript = transcript.write().await;
                if !opened {
                    transcript.begin_assistant();
                    opened = true;
                }
                match event {
                    StreamEvent::ContentDelta { text } => transcript.append_delta(&text),
                    StreamEvent::FollowUps { options } => transcript.attach_follow_ups(options),
                    _ => {}
                }
            }
        })
    }

    /// Pick the classification source for a completed exchange: in-stream
    /// metadata when the advisor sent it, otherwise the dedicated
    /// round-trip. Round-trip failures degrade to "no classification".
    async fn classification_for(
        &self,
        user_text: &str,
        streamed: &StreamOutcome,
    ) -> Option<ClassifiedExchange> {
        if let Some(metadata) = &streamed.metadata {
            return Some(ClassifiedExchange {
                classification: metadata.classification.clone(),
                suggested_questions: metadata.suggested_questions.clone().unwrap_or_default(),
            });
        }

        match self
            .engine
            .backend
            .classify_exchange(user_text, &streamed.content)
            .await
        {
            Ok(exchange) => exchange,
            Err(err) => {
                tracing::warn!(%err, "exchange classification round-trip failed");
                None
            }
        }
    }
}
