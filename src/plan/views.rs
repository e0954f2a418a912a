//! View models for the host UI — plain data, no markup.

use serde::Serialize;

use crate::bonus::catalog_totals;
use crate::catalog::{Catalog, MAX_RELIC_TIER, RELOADED_TIER};
use crate::plan::state::SelectionState;

const NO_DETAILS: &str = "No details available";
const UNREVEALED: &str = "Unrevealed";
const COMPARE_EFFECTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub current_tier: u8,
    pub chosen_relics: usize,
    pub max_relics: u8,
    pub xp_boost_total: f64,
    pub drop_rate_total: f64,
}

/// A relic as shown in the detail panel. Names missing from the catalog
/// (placeholders, stale imports) render as a placeholder, never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RelicView {
    #[serde(rename_all = "camelCase")]
    Known {
        name: String,
        tier_label: String,
        tags: Vec<String>,
        effects: Vec<String>,
        image: Option<String>,
    },
    Placeholder {
        name: String,
        image: Option<String>,
        message: &'static str,
    },
}

pub fn relic_view(catalog: &Catalog, name: &str) -> RelicView {
    let image = catalog.relic_image(name);
    match catalog.relic(name) {
        Some(relic) => RelicView::Known {
            name: relic.name.clone(),
            tier_label: relic.tier.label(),
            tags: relic.tags.clone(),
            effects: relic.effects.clone(),
            image,
        },
        None => RelicView::Placeholder {
            name: name.to_string(),
            image,
            message: NO_DETAILS,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDetail {
    pub tier: u8,
    pub points: Option<String>,
    pub pick: Option<RelicView>,
    pub passives: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOption {
    pub name: String,
    pub picked: bool,
    /// "Tier N", "Revealed", or "Unrevealed" for names without details.
    pub tier_label: String,
    pub tags: Vec<String>,
    /// The first few effects.
    pub effects: Vec<String>,
    /// How many effects were left out of `effects`.
    pub more_effects: usize,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareView {
    pub tier: u8,
    pub options: Vec<CompareOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedRelic {
    /// "3", or "5 (Reloaded)" for the bonus pick.
    pub tier_label: String,
    pub name: String,
    pub effects: Vec<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub bonus: bool,
}

pub fn kpis(state: &SelectionState, catalog: &Catalog) -> Kpis {
    let max_relics = MAX_RELIC_TIER.min(state.current_tier());
    let chosen_relics = (1..=max_relics).filter(|t| state.pick(*t).is_some()).count();
    let (xp_boost_total, drop_rate_total) = catalog_totals(catalog);
    Kpis {
        current_tier: state.current_tier(),
        chosen_relics,
        max_relics,
        xp_boost_total,
        drop_rate_total,
    }
}

/// Detail panel for the focused tier.
pub fn tier_detail(state: &SelectionState, catalog: &Catalog) -> TierDetail {
    let tier = state.active_tier();
    let meta = catalog.tier(tier);
    TierDetail {
        tier,
        points: meta.map(|m| m.points.clone()),
        pick: state.pick(tier).map(|name| relic_view(catalog, name)),
        passives: meta.map(|m| m.passives.clone()).unwrap_or_default(),
        note: state.note(tier).trim().to_string(),
    }
}

/// Side-by-side options of the focused tier.
pub fn compare(state: &SelectionState, catalog: &Catalog) -> CompareView {
    let tier = state.active_tier();
    let options = state
        .options(tier)
        .iter()
        .map(|name| {
            let picked = state.pick(tier) == Some(name.as_str());
            let image = catalog.relic_image(name);
            match catalog.relic(name) {
                Some(relic) => CompareOption {
                    name: name.clone(),
                    picked,
                    tier_label: relic.tier.label(),
                    tags: relic.tags.clone(),
                    effects: relic.effects.iter().take(COMPARE_EFFECTS).cloned().collect(),
                    more_effects: relic.effects.len().saturating_sub(COMPARE_EFFECTS),
                    image,
                },
                None => CompareOption {
                    name: name.clone(),
                    picked,
                    tier_label: UNREVEALED.to_string(),
                    tags: Vec::new(),
                    effects: Vec::new(),
                    more_effects: 0,
                    image,
                },
            }
        })
        .collect();
    CompareView { tier, options }
}

/// Every catalogued pick of tiers 1–6, then the Reloaded bonus pick.
pub fn selected_relics(state: &SelectionState, catalog: &Catalog) -> Vec<SelectedRelic> {
    let mut out = Vec::new();
    for tier in 1..=MAX_RELIC_TIER {
        let Some(relic) = state.pick(tier).and_then(|name| catalog.relic(name)) else {
            continue;
        };
        out.push(SelectedRelic {
            tier_label: tier.to_string(),
            name: relic.name.clone(),
            effects: relic.effects.clone(),
            tags: relic.tags.clone(),
            image: catalog.relic_image(&relic.name),
            bonus: false,
        });
    }
    if state.reloaded_active() {
        if let Some(relic) = state.reloaded_pick().and_then(|name| catalog.relic(name)) {
            out.push(SelectedRelic {
                tier_label: format!("{} (Reloaded)", RELOADED_TIER),
                name: relic.name.clone(),
                effects: relic.effects.clone(),
                tags: relic.tags.clone(),
                image: catalog.relic_image(&relic.name),
                bonus: true,
            });
        }
    }
    out
}
