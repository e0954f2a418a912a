//! Error types shared across the planner.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse relic catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid relic catalog: {0}")]
    Invalid(String),
}

/// Reasons a pasted import payload is rejected. Nothing is applied when
/// any of these is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("tier {0} is outside 1..=8")]
    TierOutOfRange(i64),
    #[error("tier {0} has no relic choice")]
    NoRelicChoice(u8),
    #[error("\"{relic}\" is not an option for tier {tier}")]
    NotAnOption { tier: u8, relic: String },
    #[error("tier {tier} allows at most {max} options")]
    TooManyOptions { tier: u8, max: usize },
    #[error("the bonus pick needs \"Reloaded\" chosen at tier 5")]
    ReloadedNotChosen,
    #[error("\"{0}\" cannot be taken as the Reloaded bonus pick")]
    InvalidReloadedPick(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to encode plan document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage rejected write to {key}: {reason}")]
    Write { key: String, reason: String },
}
