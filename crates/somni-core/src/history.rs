//! Session history contract.
//!
//! The engine does not know where finished sessions go; it hands a
//! [`HistoryEntry`] to whatever [`HistorySink`] was injected. The file-backed
//! store lives in its own crate and implements this trait.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::SleepReport;

/// One finished session, as persisted to history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Session start, microseconds since the Unix epoch.
    pub started_at_us: i64,
    /// Session start as an RFC 3339 date string.
    pub started_at: String,
    pub duration_seconds: u64,
    pub duration_formatted: String,
    pub quality_score: u8,
    pub quality_rating: String,
    pub report: SleepReport,
}

/// Destination for finished sessions. Object safe so the engine can hold a
/// boxed sink without naming the storage crate.
pub trait HistorySink: Send {
    /// Persist one entry. Errors are reported as strings; the engine logs
    /// them and keeps going, a failed write never aborts session teardown.
    fn append(&mut self, entry: HistoryEntry) -> Result<(), String>;
}

/// Sink that remembers entries in memory. Useful in tests and for callers
/// that only want the return value of a stopped session.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<HistoryEntry>,
}

impl HistorySink for MemorySink {
    fn append(&mut self, entry: HistoryEntry) -> Result<(), String> {
        self.entries.push(entry);
        Ok(())
    }
}
