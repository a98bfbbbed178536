//! Engine services

pub mod research_session;
pub mod thesis;

pub use research_session::{ExchangeOutcome, ResearchEngine, ResearchSession};
pub use thesis::{FinalizedThesis, ThesisService};
