//! Research Progress Model
//!
//! Per-(user, subject) completion state over the 3x3 taxonomy grid, modeled
//! as an immutable snapshot transformed by a pure reducer. Counters only
//! grow and summary points are set-like ordered appends, so monotonicity is
//! checkable at the type level of operations rather than scattered call
//! sites.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::taxonomy::{Section, Taxonomy};

/// Tunable knobs of the progress model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Questions needed to fully complete one subsection
    #[serde(default = "default_questions_per_subsection")]
    pub questions_per_subsection: u32,
    /// Overall completion percentage that unlocks thesis finalization
    #[serde(default = "default_unlock_threshold")]
    pub unlock_threshold: f64,
}

fn default_questions_per_subsection() -> u32 {
    5
}

fn default_unlock_threshold() -> f64 {
    60.0
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            questions_per_subsection: default_questions_per_subsection(),
            unlock_threshold: default_unlock_threshold(),
        }
    }
}

/// Completion state of one grid cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsectionProgress {
    /// How many classified questions landed in this cell. Uncapped; the
    /// completion formula clamps at the configured mark.
    #[serde(default)]
    pub questions_asked: u32,
    /// Distinct one-sentence summaries, in arrival order
    #[serde(default)]
    pub summary_points: Vec<String>,
}

/// An event the reducer applies to a progress snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// One classified exchange landed in a cell
    QuestionRecorded {
        section: Section,
        subsection: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
}

/// The full 3x3 progress grid for one (user, subject) pair.
///
/// Serializes as nested maps keyed by section and subsection labels; cells
/// are created lazily, so a fresh record is an empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressRecord {
    sections: BTreeMap<String, BTreeMap<String, SubsectionProgress>>,
}

impl ProgressRecord {
    /// The cell for a (section, subsection) pair, if it has been touched
    pub fn cell(&self, section: Section, subsection: &str) -> Option<&SubsectionProgress> {
        self.sections
            .get(section.as_str())
            .and_then(|cells| cells.get(subsection))
    }

    /// Apply one event, returning the successor snapshot.
    ///
    /// Pure: the input record is untouched. Counters never decrease, and a
    /// summary is appended only when non-empty and not already present.
    pub fn apply(&self, event: &ProgressEvent) -> ProgressRecord {
        let mut next = self.clone();
        match event {
            ProgressEvent::QuestionRecorded {
                section,
                subsection,
                summary,
            } => {
                let cell = next
                    .sections
                    .entry(section.as_str().to_string())
                    .or_default()
                    .entry(subsection.clone())
                    .or_default();
                cell.questions_asked += 1;
                if let Some(summary) = summary {
                    let summary = summary.trim();
                    if !summary.is_empty() && !cell.summary_points.iter().any(|p| p == summary) {
                        cell.summary_points.push(summary.to_string());
                    }
                }
            }
        }
        next
    }

    /// Completion of one cell, in [0, 100]
    pub fn subsection_completion(
        &self,
        section: Section,
        subsection: &str,
        config: &ProgressConfig,
    ) -> f64 {
        let asked = self
            .cell(section, subsection)
            .map(|c| c.questions_asked)
            .unwrap_or(0);
        let ratio = f64::from(asked) / f64::from(config.questions_per_subsection.max(1));
        ratio.min(1.0) * 100.0
    }

    /// Completion of one section: arithmetic mean of its three cells
    pub fn section_completion(
        &self,
        section: Section,
        taxonomy: &Taxonomy,
        config: &ProgressConfig,
    ) -> f64 {
        let subsections = taxonomy.subsections(section);
        if subsections.is_empty() {
            return 0.0;
        }
        let sum: f64 = subsections
            .iter()
            .map(|sub| self.subsection_completion(section, sub, config))
            .sum();
        sum / subsections.len() as f64
    }

    /// Overall completion: arithmetic mean of the three sections
    pub fn overall_completion(&self, taxonomy: &Taxonomy, config: &ProgressConfig) -> f64 {
        let sum: f64 = Section::ALL
            .iter()
            .map(|&section| self.section_completion(section, taxonomy, config))
            .sum();
        sum / Section::ALL.len() as f64
    }

    /// Whether the thesis finalizer is unlocked
    pub fn is_unlocked(&self, taxonomy: &Taxonomy, config: &ProgressConfig) -> bool {
        self.overall_completion(taxonomy, config) >= config.unlock_threshold
    }
}
