//! Per-worker plan session.
//!
//! Uses `thread_local!` + `RefCell` for safe mutable access in single-threaded
//! WASM. The Web Worker keeps the WASM module alive, so the session persists
//! across `handle_request` calls for the entire browser session.

use std::cell::RefCell;

use crate::catalog::Catalog;
use crate::error::{ImportError, StorageError};
use crate::plan::document::{import_document, load_document};
use crate::plan::persist::{MemoryStorage, PlanStorage, PlannerConfig, SaveScheduler};
use crate::plan::state::SelectionState;

/// Everything one open planner page needs.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: SelectionState,
    pub scheduler: SaveScheduler,
    pub storage: MemoryStorage,
    pub config: PlannerConfig,
}

impl Session {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            state: SelectionState::new(Catalog::builtin()),
            scheduler: SaveScheduler::new(config.save_delay),
            storage: MemoryStorage::default(),
            config,
        }
    }

    /// Apply an edit and schedule a save.
    pub fn edit<R>(&mut self, now_ms: u64, f: impl FnOnce(&mut SelectionState) -> R) -> R {
        let out = f(&mut self.state);
        self.scheduler.mark_dirty(now_ms);
        out
    }

    /// Write the document if the debounce window elapsed. Returns the stored
    /// document text when a write happened.
    pub fn poll_save(&mut self, now_ms: u64) -> Result<Option<String>, StorageError> {
        let wrote = self.scheduler.poll(
            now_ms,
            &mut self.state,
            &mut self.storage,
            &self.config.storage_key,
        )?;
        Ok(if wrote {
            self.storage.read(&self.config.storage_key)
        } else {
            None
        })
    }

    /// Write the document now and return it.
    pub fn flush(&mut self, now_ms: u64) -> Result<Option<String>, StorageError> {
        self.scheduler.flush(
            now_ms,
            &mut self.state,
            &mut self.storage,
            &self.config.storage_key,
        )?;
        Ok(self.storage.read(&self.config.storage_key))
    }

    /// Restore from the host's stored text; a broken document gives defaults.
    pub fn restore(&mut self, raw: &str) {
        self.state = load_document(Some(raw), Catalog::builtin());
        self.scheduler = SaveScheduler::new(self.config.save_delay);
    }

    /// Replace the plan with an imported one, or leave it untouched on error.
    pub fn import(&mut self, text: &str, now_ms: u64) -> Result<(), ImportError> {
        let imported = import_document(text, Catalog::builtin())?;
        self.state = imported;
        self.scheduler.mark_dirty(now_ms);
        Ok(())
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.state.reset(Catalog::builtin());
        self.scheduler.mark_dirty(now_ms);
    }
}

thread_local! {
    static SESSION: RefCell<Session> = RefCell::new(Session::new(PlannerConfig::default()));
}

/// Execute a closure with read access to the session.
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&Session) -> R,
{
    SESSION.with(|s| f(&s.borrow()))
}

/// Execute a closure with mutable access to the session.
pub fn with_session_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut Session) -> R,
{
    SESSION.with(|s| f(&mut s.borrow_mut()))
}

/// Replace the whole session (used by tests and by reconfiguration).
pub fn replace_session(session: Session) {
    SESSION.with(|s| {
        *s.borrow_mut() = session;
    });
}

pub fn reset_session() {
    replace_session(Session::new(PlannerConfig::default()));
}
