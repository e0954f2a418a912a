//! Selection state — the user's plan and the only mutable aggregate.
//!
//! Field names and shapes match the persisted document (`planName`,
//! `tierOptions`, ...). Every mutation goes through a method here so the
//! invariants hold after each call:
//!
//! - `active_tier` and `current_tier` stay within `1..=8`.
//! - A non-empty pick is a member of its tier's option set.
//! - `reloaded_pick` is empty unless tier 5 holds "Reloaded", and otherwise
//!   names a tier 1–4 option that is not that tier's own pick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{
    Catalog, MAX_OPTIONS_PER_TIER, MAX_RELIC_TIER, MAX_TIER, MIN_TIER, RELOADED,
    RELOADED_SOURCE_TIERS, RELOADED_TIER, clamp_tier, is_placeholder,
};
use crate::error::PlanError;

/// A relic that may be taken as the Reloaded bonus pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadedCandidate {
    pub tier: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub(crate) plan_name: String,
    pub(crate) global_notes: String,
    pub(crate) active_tier: u8,
    pub(crate) current_tier: u8,
    pub(crate) tier_options: BTreeMap<u8, Vec<String>>,
    pub(crate) picks: BTreeMap<u8, String>,
    pub(crate) notes: BTreeMap<u8, String>,
    pub(crate) reloaded_pick: String,
    /// Epoch milliseconds of the last flush to storage.
    pub(crate) updated_at: u64,
    /// Top-level fields this version does not know, written back verbatim.
    #[serde(skip)]
    pub(crate) extra: serde_json::Map<String, serde_json::Value>,
}

fn check_tier(tier: i64) -> Result<u8, PlanError> {
    if (MIN_TIER as i64..=MAX_TIER as i64).contains(&tier) {
        Ok(tier as u8)
    } else {
        Err(PlanError::TierOutOfRange(tier))
    }
}

impl SelectionState {
    /// Fresh plan: the catalog's option sets, the first option picked at
    /// every tier, full progress, tier 1 focused.
    pub fn new(catalog: &Catalog) -> Self {
        let mut tier_options = BTreeMap::new();
        let mut picks = BTreeMap::new();
        let mut notes = BTreeMap::new();
        for t in MIN_TIER..=MAX_TIER {
            let options = catalog.default_options(t).to_vec();
            picks.insert(t, options.first().cloned().unwrap_or_default());
            notes.insert(t, String::new());
            tier_options.insert(t, options);
        }
        Self {
            plan_name: String::new(),
            global_notes: String::new(),
            active_tier: MIN_TIER,
            current_tier: MAX_TIER,
            tier_options,
            picks,
            notes,
            reloaded_pick: String::new(),
            updated_at: 0,
            extra: serde_json::Map::new(),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn plan_name(&self) -> &str {
        &self.plan_name
    }

    pub fn global_notes(&self) -> &str {
        &self.global_notes
    }

    pub fn active_tier(&self) -> u8 {
        self.active_tier
    }

    pub fn current_tier(&self) -> u8 {
        self.current_tier
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    /// The relic picked at `tier`, if any.
    pub fn pick(&self, tier: u8) -> Option<&str> {
        self.picks
            .get(&tier)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn note(&self, tier: u8) -> &str {
        self.notes.get(&tier).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn options(&self, tier: u8) -> &[String] {
        self.tier_options
            .get(&tier)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn reloaded_pick(&self) -> Option<&str> {
        Some(self.reloaded_pick.as_str()).filter(|s| !s.is_empty())
    }

    /// Whether tier 5 currently holds "Reloaded".
    pub fn reloaded_active(&self) -> bool {
        self.pick(RELOADED_TIER) == Some(RELOADED)
    }

    // ── Mutations ──────────────────────────────────────────────────

    pub fn set_plan_name(&mut self, name: &str) {
        self.plan_name = name.to_string();
    }

    pub fn set_global_notes(&mut self, notes: &str) {
        self.global_notes = notes.to_string();
    }

    pub fn set_note(&mut self, tier: i64, note: &str) -> Result<(), PlanError> {
        let tier = check_tier(tier)?;
        self.notes.insert(tier, note.to_string());
        Ok(())
    }

    /// Focus a tier's detail view. Out-of-range values are clamped.
    pub fn set_active_tier(&mut self, tier: i64) -> u8 {
        self.active_tier = clamp_tier(tier);
        self.active_tier
    }

    /// Declare progression depth. Out-of-range values are clamped.
    pub fn set_current_tier(&mut self, tier: i64) -> u8 {
        self.current_tier = clamp_tier(tier);
        self.current_tier
    }

    /// Pick a relic for a tier (an empty name clears the pick).
    ///
    /// Moving tier 5 away from "Reloaded" clears the bonus pick, as does
    /// picking the bonus relic for its own tier.
    pub fn set_pick(&mut self, tier: i64, relic: &str) -> Result<(), PlanError> {
        let tier = check_tier(tier)?;
        if tier > MAX_RELIC_TIER {
            return Err(PlanError::NoRelicChoice(tier));
        }
        if !relic.is_empty() && !self.options(tier).iter().any(|o| o == relic) {
            return Err(PlanError::NotAnOption {
                tier,
                relic: relic.to_string(),
            });
        }

        self.picks.insert(tier, relic.to_string());
        self.revalidate_reloaded();

        tracing::debug!(
            target: "paragon::plan",
            tier,
            relic,
            "plan.pick.set"
        );
        Ok(())
    }

    /// Choose the Reloaded bonus relic (an empty name clears it).
    pub fn set_reloaded_pick(&mut self, relic: &str) -> Result<(), PlanError> {
        if relic.is_empty() {
            self.reloaded_pick.clear();
            return Ok(());
        }
        if !self.reloaded_active() {
            return Err(PlanError::ReloadedNotChosen);
        }
        if !self.reloaded_candidates().iter().any(|c| c.name == relic) {
            return Err(PlanError::InvalidReloadedPick(relic.to_string()));
        }
        self.reloaded_pick = relic.to_string();
        tracing::debug!(target: "paragon::plan", relic, "plan.reloaded.set");
        Ok(())
    }

    /// Replace the candidates offered at a tier. A pick that is no longer
    /// offered is cleared.
    pub fn set_tier_options(&mut self, tier: i64, options: Vec<String>) -> Result<(), PlanError> {
        let tier = check_tier(tier)?;
        if options.len() > MAX_OPTIONS_PER_TIER {
            return Err(PlanError::TooManyOptions {
                tier,
                max: MAX_OPTIONS_PER_TIER,
            });
        }
        self.tier_options.insert(tier, options);
        self.drop_stale_pick(tier);
        self.revalidate_reloaded();
        Ok(())
    }

    /// Relics from tiers 1–4 that are not the tier's own pick, in tier order.
    pub fn reloaded_candidates(&self) -> Vec<ReloadedCandidate> {
        let mut out = Vec::new();
        for tier in RELOADED_SOURCE_TIERS {
            for name in self.options(tier) {
                if self.pick(tier) != Some(name.as_str()) && !is_placeholder(name) {
                    out.push(ReloadedCandidate {
                        tier,
                        name: name.clone(),
                    });
                }
            }
        }
        out
    }

    /// Back to a fresh plan.
    pub fn reset(&mut self, catalog: &Catalog) {
        *self = SelectionState::new(catalog);
        tracing::info!(target: "paragon::plan", "plan.reset");
    }

    /// Restore every invariant after loading or importing a document.
    pub(crate) fn normalize(&mut self) {
        self.active_tier = clamp_tier(self.active_tier as i64);
        self.current_tier = clamp_tier(self.current_tier as i64);
        for (tier, options) in self.tier_options.iter_mut() {
            if options.len() > MAX_OPTIONS_PER_TIER {
                tracing::debug!(
                    target: "paragon::plan",
                    tier = *tier,
                    dropped = options.len() - MAX_OPTIONS_PER_TIER,
                    "plan.options.truncated"
                );
                options.truncate(MAX_OPTIONS_PER_TIER);
            }
        }
        let tiers: Vec<u8> = self.picks.keys().copied().collect();
        for tier in tiers {
            self.drop_stale_pick(tier);
        }
        self.revalidate_reloaded();
    }

    fn drop_stale_pick(&mut self, tier: u8) {
        let stale = match self.pick(tier) {
            Some(name) => !self.options(tier).iter().any(|o| o == name),
            None => false,
        };
        if stale {
            tracing::debug!(target: "paragon::plan", tier, "plan.pick.cleared");
            self.picks.insert(tier, String::new());
        }
    }

    fn revalidate_reloaded(&mut self) {
        let Some(current) = self.reloaded_pick() else {
            return;
        };
        let valid = self.reloaded_active()
            && self.reloaded_candidates().iter().any(|c| c.name == current);
        if !valid {
            tracing::debug!(
                target: "paragon::plan",
                relic = current,
                "plan.reloaded.cleared"
            );
            self.reloaded_pick.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> SelectionState {
        SelectionState::new(Catalog::builtin())
    }

    #[test]
    fn defaults_pick_first_option() {
        let state = fresh();
        assert_eq!(state.pick(1), Some("Fluid Strikes"));
        assert_eq!(state.pick(5), Some("Paladin"));
        assert_eq!(state.pick(7), Some("(Unknown relic 1)"));
        assert_eq!(state.active_tier(), 1);
        assert_eq!(state.current_tier(), 8);
        assert_eq!(state.reloaded_pick(), None);
        assert_eq!(state.note(3), "");
    }

    #[test]
    fn tiers_are_clamped() {
        let mut state = fresh();
        assert_eq!(state.set_current_tier(0), 1);
        assert_eq!(state.set_current_tier(12), 8);
        assert_eq!(state.set_active_tier(-3), 1);
        assert_eq!(state.set_active_tier(4), 4);
    }

    #[test]
    fn pick_must_be_an_option() {
        let mut state = fresh();
        assert_eq!(
            state.set_pick(1, "Wrath"),
            Err(PlanError::NotAnOption {
                tier: 1,
                relic: "Wrath".to_string()
            })
        );
        assert_eq!(state.pick(1), Some("Fluid Strikes"));
        assert_eq!(state.set_pick(7, "(Unknown relic 2)"), Err(PlanError::NoRelicChoice(7)));
        assert_eq!(state.set_pick(9, "x"), Err(PlanError::TierOutOfRange(9)));
    }

    #[test]
    fn empty_pick_clears() {
        let mut state = fresh();
        state.set_pick(2, "").unwrap();
        assert_eq!(state.pick(2), None);
    }

    #[test]
    fn leaving_reloaded_clears_bonus_pick() {
        let mut state = fresh();
        state.set_pick(5, RELOADED).unwrap();
        state.set_reloaded_pick("Slayer Master").unwrap();
        assert_eq!(state.reloaded_pick(), Some("Slayer Master"));

        state.set_pick(5, "Hands Free").unwrap();
        assert_eq!(state.reloaded_pick(), None);
    }

    #[test]
    fn reselecting_reloaded_keeps_bonus_pick() {
        let mut state = fresh();
        state.set_pick(5, RELOADED).unwrap();
        state.set_reloaded_pick("Quick Shot").unwrap();
        state.set_pick(5, RELOADED).unwrap();
        assert_eq!(state.reloaded_pick(), Some("Quick Shot"));
    }

    #[test]
    fn bonus_pick_requires_reloaded() {
        let mut state = fresh();
        assert_eq!(
            state.set_reloaded_pick("Quick Shot"),
            Err(PlanError::ReloadedNotChosen)
        );
        assert_eq!(state.reloaded_pick(), None);
    }

    #[test]
    fn bonus_pick_cannot_repeat_own_tier_pick() {
        let mut state = fresh();
        state.set_pick(5, RELOADED).unwrap();
        assert_eq!(
            state.set_reloaded_pick("Fluid Strikes"),
            Err(PlanError::InvalidReloadedPick("Fluid Strikes".to_string()))
        );
        assert!(state.set_reloaded_pick("Wrath").is_err());
        assert!(state.set_reloaded_pick("Paladin").is_err());
    }

    #[test]
    fn picking_bonus_relic_for_its_tier_clears_bonus() {
        let mut state = fresh();
        state.set_pick(5, RELOADED).unwrap();
        state.set_reloaded_pick("Quick Shot").unwrap();
        state.set_pick(1, "Quick Shot").unwrap();
        assert_eq!(state.reloaded_pick(), None);
    }

    #[test]
    fn candidates_skip_own_picks_and_placeholders() {
        let mut state = fresh();
        state
            .set_tier_options(4, vec!["(Unknown)".to_string(), "Prestigious".to_string()])
            .unwrap();
        let names: Vec<String> = state
            .reloaded_candidates()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert!(!names.contains(&"Fluid Strikes".to_string()));
        assert!(names.contains(&"Quick Shot".to_string()));
        assert!(!names.iter().any(|n| n.starts_with('(')));
        assert!(names.contains(&"Prestigious".to_string()));
        // tiers 1-3 contribute two each, tier 4 one after its pick was cleared
        assert_eq!(state.pick(4), None);
        assert_eq!(names.len(), 2 + 2 + 2 + 1);
    }

    #[test]
    fn reconfiguring_options_drops_stale_pick() {
        let mut state = fresh();
        state
            .set_tier_options(3, vec!["Ferality".to_string()])
            .unwrap();
        assert_eq!(state.pick(3), None);
        assert_eq!(
            state.set_tier_options(3, vec!["a".into(), "b".into(), "c".into(), "d".into()]),
            Err(PlanError::TooManyOptions { tier: 3, max: 3 })
        );
    }

    #[test]
    fn notes_and_names() {
        let mut state = fresh();
        state.set_plan_name("Iron route");
        state.set_global_notes("go slayer first");
        state.set_note(2, "take Slayer Master").unwrap();
        assert_eq!(state.plan_name(), "Iron route");
        assert_eq!(state.global_notes(), "go slayer first");
        assert_eq!(state.note(2), "take Slayer Master");
        assert!(state.set_note(0, "nope").is_err());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = fresh();
        state.set_plan_name("x");
        state.set_current_tier(2);
        state.set_pick(5, RELOADED).unwrap();
        state.reset(Catalog::builtin());
        assert_eq!(state, fresh());
    }
}
