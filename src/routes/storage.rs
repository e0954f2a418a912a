//! `/api/plan/*` persistence routes: debounced save, restore, export, import.
//!
//! The host owns `localStorage`. It restores the stored document on page load,
//! polls `persist` with its clock and writes back whatever text comes out.

use serde::Serialize;

use crate::plan::document::export_document;
use crate::plan::session::{with_session, with_session_mut};
use crate::routes::util::{
    escape_html, get_now, json, json_error, parse_form_body, parse_query, percent_decode,
};

/// Document text from a body that is either raw JSON or `state={urlencoded}`.
fn document_text(body: &str) -> String {
    let body = body.trim();
    match body.strip_prefix("state=") {
        Some(encoded) => percent_decode(encoded),
        None => body.to_string(),
    }
}

// ── GET /api/plan/status ───────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    status: &'static str,
    pending: bool,
}

/// The save pill: "Saved" or "Unsaved".
pub fn handle_status_get(_query: &str) -> String {
    with_session(|s| {
        json(&StatusView {
            status: s.scheduler.status().label(),
            pending: s.scheduler.is_pending(),
        })
    })
}

// ── POST /api/plan/persist ─────────────────────────────────────────

/// Handle POST /api/plan/persist (body `now={epoch ms}`).
/// Returns the document to store when the debounce window elapsed, an empty
/// string when there is nothing to write yet.
pub fn handle_persist_post(body: &str) -> String {
    let params = parse_form_body(body);
    let now = get_now(&params);
    with_session_mut(|s| match s.poll_save(now) {
        Ok(Some(document)) => document,
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!(target: "paragon::persist", error = %e, "persist.failed");
            json_error(&e.to_string())
        }
    })
}

// ── POST /api/plan/flush ───────────────────────────────────────────

/// Write immediately (page hide / unload) and return the document.
pub fn handle_flush_post(body: &str) -> String {
    let params = parse_form_body(body);
    let now = get_now(&params);
    with_session_mut(|s| match s.flush(now) {
        Ok(document) => document.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(target: "paragon::persist", error = %e, "persist.failed");
            json_error(&e.to_string())
        }
    })
}

// ── POST /api/plan/restore ─────────────────────────────────────────

/// Handle POST /api/plan/restore
/// Loads the document the host read from `localStorage`. A missing or broken
/// document leaves a fresh default plan; this never fails.
pub fn handle_restore_post(body: &str) -> String {
    let text = document_text(body);
    with_session_mut(|s| s.restore(&text));
    "ok".to_string()
}

// ── GET /api/plan/export ───────────────────────────────────────────

/// Pretty-printed document for the clipboard or a download.
pub fn handle_export_get(_query: &str) -> String {
    with_session(|s| match export_document(&s.state) {
        Ok(text) => text,
        Err(e) => json_error(&e.to_string()),
    })
}

// ── POST /api/plan/import ──────────────────────────────────────────

/// Handle POST /api/plan/import?now={epoch ms}
/// Replaces the plan with a pasted document. On failure the current plan is
/// kept and the reason is shown.
pub fn handle_import_post(query: &str, body: &str) -> String {
    let now = get_now(&parse_query(query));
    let text = document_text(body);
    match with_session_mut(|s| s.import(&text, now)) {
        Ok(()) => {
            tracing::info!(target: "paragon::routes", bytes = text.len(), "plan.imported");
            r#"<span class="text-emerald-600">Imported successfully.</span>"#.to_string()
        }
        Err(e) => {
            tracing::warn!(target: "paragon::routes", error = %e, "plan.import.rejected");
            format!(
                r#"<span class="text-kip-red">Import failed: {}</span>"#,
                escape_html(&e.to_string())
            )
        }
    }
}
