//! Thesis Finalization
//!
//! The two-state machine that closes a research session: `Exploring` until
//! the user commits a stance, `Finalized` afterward. A new save overwrites
//! the prior one (upsert, not a log). Unlock gating lives with the caller;
//! this module only validates the stance itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::ProgressRecord;
use crate::taxonomy::{Section, Taxonomy};

/// How many summary points each section contributes to the finalize surface
pub const SUMMARY_POINTS_PER_SECTION: usize = 5;

/// The closed set of commitable stances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThesisStance {
    Bullish,
    Neutral,
    Bearish,
    Custom,
}

impl ThesisStance {
    /// Convert to the storage string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ThesisStance::Bullish => "bullish",
            ThesisStance::Neutral => "neutral",
            ThesisStance::Bearish => "bearish",
            ThesisStance::Custom => "custom",
        }
    }

    /// Parse from the storage string representation
    pub fn parse(s: &str) -> Result<Self, ThesisError> {
        match s {
            "bullish" => Ok(ThesisStance::Bullish),
            "neutral" => Ok(ThesisStance::Neutral),
            "bearish" => Ok(ThesisStance::Bearish),
            "custom" => Ok(ThesisStance::Custom),
            _ => Err(ThesisError::UnknownStance(s.to_string())),
        }
    }
}

impl std::fmt::Display for ThesisStance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The committed stance for one (user, subject) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisRecord {
    pub stance: ThesisStance,
    /// Free text, present iff the stance is custom
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// Finalizer state for one (user, subject) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizerState {
    #[default]
    Exploring,
    Finalized,
}

/// Errors from thesis validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThesisError {
    #[error("Unknown stance: {0}")]
    UnknownStance(String),
    #[error("A custom stance requires a written thesis")]
    MissingCustomText,
}

/// Build a thesis record from a stance selection.
///
/// Validates the custom-text rule; any stance may be saved again later
/// (upsert), so finalizing from `Finalized` is legal.
pub fn build_record(
    stance: ThesisStance,
    custom_text: Option<&str>,
    saved_at: DateTime<Utc>,
) -> Result<ThesisRecord, ThesisError> {
    let custom_text = custom_text.map(str::trim).filter(|t| !t.is_empty());
    if stance == ThesisStance::Custom && custom_text.is_none() {
        return Err(ThesisError::MissingCustomText);
    }
    Ok(ThesisRecord {
        stance,
        custom_text: if stance == ThesisStance::Custom {
            custom_text.map(|t| t.to_string())
        } else {
            None
        },
        saved_at,
    })
}

/// Summary points supporting the stance, grouped by section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section: Section,
    pub points: Vec<String>,
}

/// Pool the supporting summary points from all nine progress cells.
///
/// Within each section, points are ordered most-recent-first (each cell's
/// list is an append log, read backwards) and capped at
/// [`SUMMARY_POINTS_PER_SECTION`].
pub fn pool_summary_points(record: &ProgressRecord, taxonomy: &Taxonomy) -> Vec<SectionSummary> {
    Section::ALL
        .iter()
        .map(|&section| {
            let mut points = Vec::new();
            for subsection in taxonomy.subsections(section) {
                if let Some(cell) = record.cell(section, subsection) {
                    points.extend(cell.summary_points.iter().rev().cloned());
                }
            }
            points.truncate(SUMMARY_POINTS_PER_SECTION);
            SectionSummary { section, points }
        })
        .collect()
}
