//! Thesis Service
//!
//! Persistence and read surface for thesis finalization. The unlock
//! threshold is exposed for callers to gate their entry points; `finalize`
//! itself only validates the stance, so a direct call before unlock still
//! succeeds.

use chrono::Utc;

use conviction_research::{
    build_record, pool_summary_points, FinalizerState, ProgressConfig, SectionSummary, Taxonomy,
    ThesisRecord, ThesisStance,
};

use crate::storage::Database;
use crate::utils::error::AppResult;

/// A committed thesis plus its supporting evidence
#[derive(Debug, Clone)]
pub struct FinalizedThesis {
    pub record: ThesisRecord,
    /// Summary points pooled from the progress grid, grouped by section,
    /// most recent first
    pub supporting: Vec<SectionSummary>,
}

/// Service for committing and reading thesis records
pub struct ThesisService {
    db: Database,
    taxonomy: Taxonomy,
    progress_config: ProgressConfig,
}

impl ThesisService {
    pub fn new(db: Database, taxonomy: Taxonomy, progress_config: ProgressConfig) -> Self {
        Self {
            db,
            taxonomy,
            progress_config,
        }
    }

    /// Finalizer state for a (user, subject) pair: `Finalized` once a
    /// thesis row exists.
    pub fn state(&self, user_id: &str, subject_id: &str) -> AppResult<FinalizerState> {
        Ok(match self.db.get_thesis(user_id, subject_id)? {
            Some(_) => FinalizerState::Finalized,
            None => FinalizerState::Exploring,
        })
    }

    /// Whether overall completion has crossed the unlock threshold
    pub fn is_unlocked(&self, user_id: &str, subject_id: &str) -> AppResult<bool> {
        let progress = self.db.get_progress(user_id, subject_id)?.unwrap_or_default();
        Ok(progress.is_unlocked(&self.taxonomy, &self.progress_config))
    }

    /// The live thesis record, if one has been committed
    pub fn current(&self, user_id: &str, subject_id: &str) -> AppResult<Option<ThesisRecord>> {
        self.db.get_thesis(user_id, subject_id)
    }

    /// Commit a stance. Upserts the single live row for the pair and
    /// returns the record together with its supporting summary points.
    pub fn finalize(
        &self,
        user_id: &str,
        subject_id: &str,
        stance: ThesisStance,
        custom_text: Option<&str>,
    ) -> AppResult<FinalizedThesis> {
        let record = build_record(stance, custom_text, Utc::now())?;
        self.db.upsert_thesis(user_id, subject_id, &record)?;
        tracing::info!(user_id, subject_id, stance = %record.stance, "thesis finalized");

        let progress = self.db.get_progress(user_id, subject_id)?.unwrap_or_default();
        let supporting = pool_summary_points(&progress, &self.taxonomy);

        Ok(FinalizedThesis { record, supporting })
    }
}
