//! Conviction Research
//!
//! Pure domain logic of the research engine: the fixed 3x3 taxonomy, the
//! progress reducer and its completion math, the keyword milestone detector,
//! and thesis finalization. No I/O, no async: everything here is
//! deterministic and directly testable.

pub mod milestones;
pub mod progress;
pub mod taxonomy;
pub mod thesis;

// Re-export main types
pub use milestones::{MilestoneDetector, MilestoneSet};
pub use progress::{ProgressConfig, ProgressEvent, ProgressRecord, SubsectionProgress};
pub use taxonomy::{CellKey, Section, Taxonomy};
pub use thesis::{
    build_record, pool_summary_points, FinalizerState, SectionSummary, ThesisError, ThesisRecord,
    ThesisStance, SUMMARY_POINTS_PER_SECTION,
};
