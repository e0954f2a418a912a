//! Plan module — the user's relic route, its persisted document, debounced
//! saving, and the view data derived from it.
//!
//! State lives in WASM memory (thread_local) for the lifetime of the Web
//! Worker; see [`session`].

pub mod document;
pub mod persist;
pub mod session;
pub mod state;
pub mod views;
