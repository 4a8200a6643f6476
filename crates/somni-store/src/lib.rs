//! File-backed session history with a bounded, most-recent-first view.
//!
//! The whole history lives in one JSON file: an array of
//! [`HistoryEntry`] values, oldest first, capped at
//! [`HistoryStore::MAX_ENTRIES`]. Every append rewrites the file; the store
//! is a small sidecar, not a database.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use somni_core::{HistoryEntry, HistorySink};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compact listing row for one stored session.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub id: Uuid,
    pub started_at: String,
    pub duration_formatted: String,
    pub quality_score: u8,
    pub quality_rating: String,
}

impl From<&HistoryEntry> for HistorySummary {
    fn from(e: &HistoryEntry) -> Self {
        HistorySummary {
            id: e.id,
            started_at: e.started_at.clone(),
            duration_formatted: e.duration_formatted.clone(),
            quality_score: e.quality_score,
            quality_rating: e.quality_rating.clone(),
        }
    }
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Oldest entries beyond this are evicted on append.
    pub const MAX_ENTRIES: usize = 100;

    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        HistoryStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored entries, oldest first. A missing file is an empty history;
    /// an unreadable or corrupt file is logged and treated as empty rather
    /// than failing every caller.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::error!("history file {} unreadable: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("history file {} corrupt: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Append one entry, evicting the oldest beyond the cap, and rewrite the
    /// file.
    pub fn append(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let mut entries = self.load();
        entries.push(entry);
        while entries.len() > Self::MAX_ENTRIES {
            entries.remove(0);
        }
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    /// The most recent `limit` sessions, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistorySummary> {
        self.load()
            .iter()
            .rev()
            .take(limit)
            .map(HistorySummary::from)
            .collect()
    }

    /// Full stored entry for one session id.
    pub fn find(&self, id: Uuid) -> Option<HistoryEntry> {
        self.load().into_iter().find(|e| e.id == id)
    }

    /// Stored report for one session id.
    pub fn report_for(&self, id: Uuid) -> Option<somni_core::SleepReport> {
        self.find(id).map(|e| e.report)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistorySink for HistoryStore {
    fn append(&mut self, entry: HistoryEntry) -> Result<(), String> {
        HistoryStore::append(self, entry).map_err(|e| e.to_string())
    }
}
