//! Conviction Engine
//!
//! The service layer of the Conviction investing-education app: research
//! conversations streamed from the advisor backend, a per-(user, subject)
//! progress model over the 3x3 research taxonomy, keyword milestones, and
//! thesis finalization.
//!
//! ## Module Organization
//!
//! - `models` - transcript and turn types
//! - `services` - the research session orchestrator and thesis service
//! - `storage` - SQLite persistence for progress, milestones, and theses
//! - `utils` - application error type and per-key write locks
//!
//! The workspace crates underneath carry the reusable pieces: stream event
//! types (`conviction-core`), the advisor boundary with its frame decoder
//! (`conviction-advisor`), and the pure research domain model
//! (`conviction-research`).

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::{ConversationTurn, Transcript};
pub use services::{ExchangeOutcome, FinalizedThesis, ResearchEngine, ResearchSession, ThesisService};
pub use storage::Database;
pub use utils::{AppError, AppResult};
