//! `/api/plan/*` routes — plan mutations and the data views derived from it.
//!
//! Every mutation answers with the updated plan document as JSON, or
//! `{"error": "..."}` when the edit was rejected (the plan is unchanged).
//! Mutating bodies may carry `now={epoch ms}` so the debounced save can be
//! scheduled against the host clock.

use serde::Serialize;

use crate::bonus::compute_summary;
use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::plan::document::document_value;
use crate::plan::session::{Session, with_session, with_session_mut};
use crate::plan::state::ReloadedCandidate;
use crate::plan::views;
use crate::routes::util::{get_int, get_now, get_param, json, json_error, parse_form_body};

fn state_json(session: &Session) -> String {
    match document_value(&session.state) {
        Ok(value) => value.to_string(),
        Err(e) => json_error(&e.to_string()),
    }
}

fn rejected(route: &str, err: PlanError) -> String {
    tracing::debug!(target: "paragon::routes", route, error = %err, "plan.edit.rejected");
    json_error(&err.to_string())
}

// ── GET /api/plan/state ────────────────────────────────────────────

pub fn handle_state_get(_query: &str) -> String {
    with_session(state_json)
}

// ── POST /api/plan/pick ────────────────────────────────────────────

/// Body: `tier={n}&relic={name}` (empty relic clears the pick).
pub fn handle_pick_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(tier) = get_int(&params, "tier") else {
        return json_error("Missing tier parameter");
    };
    let relic = get_param(&params, "relic").unwrap_or("");
    let now = get_now(&params);

    with_session_mut(|s| {
        // Validate before scheduling a save for a rejected edit.
        let mut next = s.state.clone();
        match next.set_pick(tier, relic) {
            Ok(()) => {
                s.edit(now, |state| *state = next);
                state_json(s)
            }
            Err(e) => rejected("pick", e),
        }
    })
}

// ── GET/POST /api/plan/reloaded ────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadedView {
    active: bool,
    pick: Option<String>,
    candidates: Vec<ReloadedCandidate>,
}

/// The Reloaded bonus picker: whether it is open, the pick, and the candidates.
pub fn handle_reloaded_get(_query: &str) -> String {
    with_session(|s| {
        json(&ReloadedView {
            active: s.state.reloaded_active(),
            pick: s.state.reloaded_pick().map(str::to_string),
            candidates: if s.state.reloaded_active() {
                s.state.reloaded_candidates()
            } else {
                Vec::new()
            },
        })
    })
}

/// Body: `relic={name}` (empty clears).
pub fn handle_reloaded_post(body: &str) -> String {
    let params = parse_form_body(body);
    let relic = get_param(&params, "relic").unwrap_or("");
    let now = get_now(&params);

    with_session_mut(|s| {
        let mut next = s.state.clone();
        match next.set_reloaded_pick(relic) {
            Ok(()) => {
                s.edit(now, |state| *state = next);
                state_json(s)
            }
            Err(e) => rejected("reloaded", e),
        }
    })
}

// ── POST /api/plan/tier ────────────────────────────────────────────

/// Body: `current={n}` and/or `active={n}`. Values are clamped to 1..=8.
pub fn handle_tier_post(body: &str) -> String {
    let params = parse_form_body(body);
    let current = get_int(&params, "current");
    let active = get_int(&params, "active");
    if current.is_none() && active.is_none() {
        return json_error("Missing current or active parameter");
    }
    let now = get_now(&params);

    with_session_mut(|s| {
        s.edit(now, |state| {
            if let Some(t) = current {
                state.set_current_tier(t);
            }
            if let Some(t) = active {
                state.set_active_tier(t);
            }
        });
        state_json(s)
    })
}

// ── POST /api/plan/notes ───────────────────────────────────────────

/// Body: any of `tier={n}&note={text}`, `global={text}`, `plan_name={text}`.
pub fn handle_notes_post(body: &str) -> String {
    let params = parse_form_body(body);
    let tier_note = match (get_int(&params, "tier"), get_param(&params, "note")) {
        (Some(t), Some(note)) => Some((t, note)),
        (None, Some(_)) => return json_error("Missing tier parameter"),
        _ => None,
    };
    let global = get_param(&params, "global");
    let plan_name = get_param(&params, "plan_name");
    let now = get_now(&params);

    with_session_mut(|s| {
        let mut next = s.state.clone();
        if let Some((tier, note)) = tier_note {
            if let Err(e) = next.set_note(tier, note) {
                return rejected("notes", e);
            }
        }
        if let Some(text) = global {
            next.set_global_notes(text);
        }
        if let Some(name) = plan_name {
            next.set_plan_name(name);
        }
        s.edit(now, |state| *state = next);
        state_json(s)
    })
}

// ── POST /api/plan/options ─────────────────────────────────────────

/// Body: `tier={n}&relics={a,b,c}`. Replaces the candidates offered at a tier.
pub fn handle_options_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(tier) = get_int(&params, "tier") else {
        return json_error("Missing tier parameter");
    };
    let relics: Vec<String> = get_param(&params, "relics")
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    let now = get_now(&params);

    with_session_mut(|s| {
        let mut next = s.state.clone();
        match next.set_tier_options(tier, relics) {
            Ok(()) => {
                s.edit(now, |state| *state = next);
                state_json(s)
            }
            Err(e) => rejected("options", e),
        }
    })
}

// ── POST /api/plan/reset ───────────────────────────────────────────

pub fn handle_reset_post(body: &str) -> String {
    let params = parse_form_body(body);
    let now = get_now(&params);
    with_session_mut(|s| {
        s.reset(now);
        state_json(s)
    })
}

// ── Views ──────────────────────────────────────────────────────────

/// GET /api/plan/summary: the bonus summary for the current progress tier.
pub fn handle_summary_get(_query: &str) -> String {
    with_session(|s| json(&compute_summary(&s.state, Catalog::builtin())))
}

pub fn handle_kpis_get(_query: &str) -> String {
    with_session(|s| json(&views::kpis(&s.state, Catalog::builtin())))
}

pub fn handle_detail_get(_query: &str) -> String {
    with_session(|s| json(&views::tier_detail(&s.state, Catalog::builtin())))
}

pub fn handle_compare_get(_query: &str) -> String {
    with_session(|s| json(&views::compare(&s.state, Catalog::builtin())))
}

pub fn handle_selected_get(_query: &str) -> String {
    with_session(|s| json(&views::selected_relics(&s.state, Catalog::builtin())))
}
