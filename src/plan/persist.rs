//! Debounced persistence of the plan document.
//!
//! Edits mark the plan dirty; the write happens once the trailing window
//! has passed without a newer edit. There are no timers here. The host
//! drives time by calling [`SaveScheduler::poll`] with the current clock, and
//! tests can call [`SaveScheduler::flush`] directly.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::StorageError;
use crate::plan::document::{STORAGE_KEY, encode_document};
use crate::plan::state::SelectionState;

const DEFAULT_SAVE_DELAY_MS: u64 = 500;

/// Key/value store the document is written to (`localStorage` in the browser).
pub trait PlanStorage {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

/// In-memory storage. Holds the last written document for the host to copy
/// into `localStorage`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl PlanStorage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDelay {
    /// Write on the first poll after an edit.
    Immediate,
    /// Write once this many milliseconds pass without a newer edit.
    Trailing(u64),
}

impl SaveDelay {
    fn millis(self) -> u64 {
        match self {
            SaveDelay::Immediate => 0,
            SaveDelay::Trailing(ms) => ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub storage_key: String,
    pub save_delay: SaveDelay,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            save_delay: SaveDelay::Trailing(DEFAULT_SAVE_DELAY_MS),
        }
    }
}

/// Status shown in the host's save pill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveStatus {
    Saved,
    Unsaved,
}

impl SaveStatus {
    pub fn label(self) -> &'static str {
        match self {
            SaveStatus::Saved => "Saved",
            SaveStatus::Unsaved => "Unsaved",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveScheduler {
    delay: SaveDelay,
    due_at: Option<u64>,
    status: SaveStatus,
}

impl SaveScheduler {
    pub fn new(delay: SaveDelay) -> Self {
        Self {
            delay,
            due_at: None,
            status: SaveStatus::Saved,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// Record an edit at `now_ms`. A newer edit pushes the pending write back.
    pub fn mark_dirty(&mut self, now_ms: u64) {
        self.due_at = Some(now_ms.saturating_add(self.delay.millis()));
        self.status = SaveStatus::Unsaved;
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.due_at.is_some_and(|due| now_ms >= due)
    }

    /// Write the document if the debounce window has elapsed.
    /// Returns whether a write happened.
    pub fn poll(
        &mut self,
        now_ms: u64,
        state: &mut SelectionState,
        storage: &mut dyn PlanStorage,
        key: &str,
    ) -> Result<bool, StorageError> {
        if !self.is_due(now_ms) {
            return Ok(false);
        }
        self.flush(now_ms, state, storage, key)?;
        Ok(true)
    }

    /// Write the document now, stamping `updatedAt`.
    pub fn flush(
        &mut self,
        now_ms: u64,
        state: &mut SelectionState,
        storage: &mut dyn PlanStorage,
        key: &str,
    ) -> Result<(), StorageError> {
        state.updated_at = now_ms;
        let document = encode_document(state)?;
        let bytes = document.len();
        storage.write(key, document)?;
        self.due_at = None;
        self.status = SaveStatus::Saved;
        tracing::debug!(
            target: "paragon::persist",
            key,
            bytes,
            updated_at = now_ms,
            "persist.flush"
        );
        Ok(())
    }
}
