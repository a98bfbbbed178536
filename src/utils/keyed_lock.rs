//! Per-Key Write Serialization
//!
//! Progress and milestone records are read-modify-written as whole rows. Two
//! concurrent conversations for the same (user, subject) would race on that
//! cycle, so writers take a per-key async mutex for the duration of
//! read -> reduce -> write.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// A map of async mutexes keyed by (user id, subject id).
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding one (user, subject) record. Callers hold the
    /// guard across the full read-modify-write cycle.
    pub fn lock_for(&self, user_id: &str, subject_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry((user_id.to_string(), subject_id.to_string()))
            .or_default()
            .clone()
    }
}
