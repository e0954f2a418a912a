//! Persisted plan document — load, import and export.
//!
//! The document is the JSON form of [`SelectionState`]. Loading and importing
//! both merge the supplied object over a freshly built default document:
//! missing top-level keys and missing per-tier entries of `tierOptions`,
//! `picks` and `notes` are back-filled, so the result always has every field.
//! Unknown top-level keys are carried along and written back on export.
//!
//! The two entry points differ only in how they fail: a broken stored
//! document silently yields the defaults, a broken import is rejected.

use serde_json::{Map, Value};

use crate::catalog::{Catalog, MAX_TIER, MIN_TIER, clamp_tier};
use crate::error::ImportError;
use crate::plan::state::SelectionState;

/// `localStorage` key the host stores the document under.
pub const STORAGE_KEY: &str = "paragon_relic_route_planner_v2";

const KNOWN_FIELDS: &[&str] = &[
    "planName",
    "globalNotes",
    "activeTier",
    "currentTier",
    "tierOptions",
    "picks",
    "notes",
    "reloadedPick",
    "updatedAt",
];

const TIER_MAPS: &[&str] = &["tierOptions", "picks", "notes"];
const TIER_FIELDS: &[&str] = &["activeTier", "currentTier"];

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_tier_key(key: &str) -> bool {
    key.parse::<u8>()
        .is_ok_and(|t| (MIN_TIER..=MAX_TIER).contains(&t))
}

/// Merge a parsed document over the defaults and normalize the result.
fn merge_over_defaults(
    parsed: Map<String, Value>,
    catalog: &Catalog,
) -> Result<SelectionState, serde_json::Error> {
    let base = SelectionState::new(catalog);
    let mut merged = match serde_json::to_value(&base)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let mut extra = Map::new();

    for (key, value) in parsed {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            extra.insert(key, value);
            continue;
        }
        if value.is_null() {
            continue;
        }
        if TIER_MAPS.contains(&key.as_str()) {
            // Per-tier merge; a non-object leaves the defaults in place.
            if let (Value::Object(incoming), Some(Value::Object(target))) =
                (value, merged.get_mut(&key))
            {
                for (tier, entry) in incoming {
                    if is_tier_key(&tier) && !entry.is_null() {
                        target.insert(tier, entry);
                    }
                }
            }
            continue;
        }
        if TIER_FIELDS.contains(&key.as_str()) {
            if let Some(n) = value.as_f64() {
                merged.insert(key, Value::from(clamp_tier(n as i64)));
                continue;
            }
        }
        merged.insert(key, value);
    }

    let mut state: SelectionState = serde_json::from_value(Value::Object(merged))?;
    state.extra = extra;
    state.normalize();
    Ok(state)
}

/// Restore a plan from stored text. Absent, empty or malformed documents
/// yield the defaults.
pub fn load_document(raw: Option<&str>, catalog: &Catalog) -> SelectionState {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return SelectionState::new(catalog);
    };
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(
                target: "paragon::persist",
                found = json_kind(&other),
                "document.load.not_object"
            );
            return SelectionState::new(catalog);
        }
        Err(err) => {
            tracing::warn!(
                target: "paragon::persist",
                error = %err,
                "document.load.malformed"
            );
            return SelectionState::new(catalog);
        }
    };
    merge_over_defaults(parsed, catalog).unwrap_or_else(|err| {
        tracing::warn!(
            target: "paragon::persist",
            error = %err,
            "document.load.invalid_fields"
        );
        SelectionState::new(catalog)
    })
}

/// Parse pasted JSON into a plan. Nothing is returned on failure, so the
/// caller's current plan stays untouched.
pub fn import_document(text: &str, catalog: &Catalog) -> Result<SelectionState, ImportError> {
    let parsed = match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => map,
        other => return Err(ImportError::NotAnObject(json_kind(&other))),
    };
    let state = merge_over_defaults(parsed, catalog)?;
    tracing::info!(
        target: "paragon::persist",
        plan = state.plan_name(),
        "document.imported"
    );
    Ok(state)
}

/// The document as a JSON value, unknown fields included.
pub fn document_value(state: &SelectionState) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(state)?;
    if let Value::Object(map) = &mut value {
        for (key, extra) in &state.extra {
            map.entry(key.clone()).or_insert_with(|| extra.clone());
        }
    }
    Ok(value)
}

/// Compact JSON for storage.
pub fn encode_document(state: &SelectionState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&document_value(state)?)
}

/// Indented JSON for the export/clipboard flow.
pub fn export_document(state: &SelectionState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&document_value(state)?)
}
