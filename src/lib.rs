//! Paragon relic tier planner, compiled to WASM.
//!
//! Exports `handle_request(method, path, query, body)` for the Web Worker
//! bridge to call. Uses `matchit` for URL routing — the same router
//! engine that powers Axum.
//!
//! The planner keeps one plan per worker: relic picks for tiers 1–8, the
//! Reloaded bonus pick, notes and progress. Every derived number shown on the
//! page comes from [`bonus::compute_summary`].

use wasm_bindgen::prelude::*;

pub mod bonus;
pub mod catalog;
pub mod error;
pub mod plan;
pub mod routes;

/// Process an HTTP-like request and return the response body.
///
/// Called from JavaScript (Web Worker) via wasm-bindgen.
///
/// # Arguments
/// * `method` — HTTP method (e.g., "GET", "POST")
/// * `path`   — URL path (e.g., "/api/plan/summary")
/// * `query`  — Query string (e.g., "?now=1700000000000")
/// * `body`   — Request body (form data or a JSON document). Empty for GET.
///
/// # Returns
/// JSON for data routes, a document text for persistence routes, and an
/// HTML status fragment for import and routing errors.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    // Build the router. matchit compiles route patterns into a radix tree.
    let mut router = matchit::Router::new();

    // Register routes — the value is a &str tag we match on below
    router.insert("/api/plan/state", "state").ok();
    router.insert("/api/plan/pick", "pick").ok();
    router.insert("/api/plan/reloaded", "reloaded").ok();
    router.insert("/api/plan/tier", "tier").ok();
    router.insert("/api/plan/notes", "notes").ok();
    router.insert("/api/plan/options", "options").ok();
    router.insert("/api/plan/reset", "reset").ok();

    // Views
    router.insert("/api/plan/summary", "summary").ok();
    router.insert("/api/plan/kpis", "kpis").ok();
    router.insert("/api/plan/detail", "detail").ok();
    router.insert("/api/plan/compare", "compare").ok();
    router.insert("/api/plan/selected", "selected").ok();

    // Persistence
    router.insert("/api/plan/status", "status").ok();
    router.insert("/api/plan/persist", "persist").ok();
    router.insert("/api/plan/flush", "flush").ok();
    router.insert("/api/plan/restore", "restore").ok();
    router.insert("/api/plan/export", "export").ok();
    router.insert("/api/plan/import", "import").ok();

    let response = match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            // GET routes
            ("state", "GET") => routes::plan::handle_state_get(query),
            ("reloaded", "GET") => routes::plan::handle_reloaded_get(query),
            ("summary", "GET") => routes::plan::handle_summary_get(query),
            ("kpis", "GET") => routes::plan::handle_kpis_get(query),
            ("detail", "GET") => routes::plan::handle_detail_get(query),
            ("compare", "GET") => routes::plan::handle_compare_get(query),
            ("selected", "GET") => routes::plan::handle_selected_get(query),
            ("status", "GET") => routes::storage::handle_status_get(query),
            ("export", "GET") => routes::storage::handle_export_get(query),

            // POST routes
            ("pick", "POST") => routes::plan::handle_pick_post(body),
            ("reloaded", "POST") => routes::plan::handle_reloaded_post(body),
            ("tier", "POST") => routes::plan::handle_tier_post(body),
            ("notes", "POST") => routes::plan::handle_notes_post(body),
            ("options", "POST") => routes::plan::handle_options_post(body),
            ("reset", "POST") => routes::plan::handle_reset_post(body),
            ("persist", "POST") => routes::storage::handle_persist_post(body),
            ("flush", "POST") => routes::storage::handle_flush_post(body),
            ("restore", "POST") => routes::storage::handle_restore_post(body),
            ("import", "POST") => routes::storage::handle_import_post(query, body),

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    };
    tracing::trace!(target: "paragon::routes", method, path, bytes = response.len(), "request.handled");
    response
}

fn not_found() -> String {
    r#"<span class="text-kip-red">404 — route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-kip-red">405 — method not allowed</span>"#.to_string()
}
