//! Bonus aggregation — folds tier passives and picked relic effects into a
//! [`BonusSummary`].
//!
//! Two result sets are built independently and combined at the end:
//!
//! - **Tier passives**: every passive of every tier `<= current_tier`.
//! - **Relic effects**: the picks of tiers `1..=min(6, current_tier)`, plus the
//!   Reloaded bonus pick while tier 5 holds "Reloaded" and `current_tier >= 5`.
//!
//! Text no rule recognizes contributes nothing. Aggregation is a pure function
//! of `(state, catalog)` and never mutates either.

pub mod patterns;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{Catalog, MAX_RELIC_TIER, RELOADED, RELOADED_TIER, clamp_tier};
use crate::plan::state::SelectionState;
use patterns::{Combine, FlagRule, NumericRule, PatternTable, Stat};

/// Running value of one stat while descriptions are scanned.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    sum: f64,
    /// Whether any additive contribution was seen.
    additive: bool,
    max_total: Option<f64>,
    factor: Option<f64>,
    last: Option<f64>,
}

impl Accumulator {
    fn apply(&mut self, combine: Combine, amount: f64) {
        match combine {
            Combine::Sum => {
                self.sum += amount;
                self.additive = true;
            }
            Combine::TotalOf => {
                self.max_total = Some(self.max_total.map_or(amount, |m| m.max(amount)));
                self.additive = true;
            }
            Combine::Multiply => {
                self.factor = Some(self.factor.unwrap_or(1.0) * amount);
            }
            Combine::CompoundPercent => {
                self.factor = Some(self.factor.unwrap_or(1.0) * (1.0 + amount / 100.0));
            }
            Combine::LastWrite => {
                self.last = Some(amount);
            }
        }
    }

    fn resolve(&self, neutral: f64) -> f64 {
        if let Some(v) = self.last {
            return v;
        }
        // A cumulative "Total of" figure already includes the increments.
        let additive = self.max_total.unwrap_or(self.sum);
        match self.factor {
            Some(f) if self.additive => additive * f,
            Some(f) => neutral * f,
            None if self.additive => additive,
            None => neutral,
        }
    }
}

/// Per-stat accumulators for one source (tier passives or relic effects).
#[derive(Debug, Clone, Default)]
struct Ledger {
    stats: BTreeMap<Stat, Accumulator>,
}

impl Ledger {
    fn scan(&mut self, rules: &[NumericRule], text: &str) {
        for rule in rules {
            if let Some(amount) = rule.extract(text) {
                self.stats
                    .entry(rule.stat)
                    .or_default()
                    .apply(rule.combine, amount);
            }
        }
    }

    fn value(&self, stat: Stat) -> f64 {
        self.stats
            .get(&stat)
            .map_or(stat.neutral(), |acc| acc.resolve(stat.neutral()))
    }
}

fn push_unique(list: &mut Vec<String>, entry: String) {
    if !list.contains(&entry) {
        list.push(entry);
    }
}

fn flags<'a>(rules: &'a [FlagRule], text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    rules
        .iter()
        .filter(move |rule| rule.matches(text))
        .map(|rule| rule.label.as_str())
}

// ── Summary types ──────────────────────────────────────────────────

/// Totals from tier passives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierTotals {
    pub paragon_points: f64,
    pub drop_rate: f64,
    pub xp_boost: f64,
    pub defence_penetration: f64,
    pub minimum_hit: f64,
    pub pet_chance: f64,
    pub gather_chance: f64,
    pub slayer_picks: f64,
    pub rune_ammo_save: f64,
    pub npc_aggression: f64,
    pub auto_gathers: f64,
}

/// Totals from the counted relics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelicTotals {
    pub minimum_hit: f64,
    pub drop_rate: f64,
    pub xp_boost: f64,
    pub slayer_points: f64,
    /// Starts at 1.0; each "Deal N% more damage" multiplies by `1 + N/100`.
    pub damage_multiplier: f64,
    pub heal_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedTotals {
    pub drop_rate: f64,
    pub xp_boost: f64,
    pub minimum_hit: f64,
}

/// A relic whose effects were folded into the relic totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedRelic {
    /// The tier slot it was picked in.
    pub tier: u8,
    pub name: String,
    /// True for the extra pick granted by Reloaded.
    pub reloaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusSummary {
    pub current_tier: u8,
    pub tier: TierTotals,
    pub relic: RelicTotals,
    pub combined: CombinedTotals,
    /// Qualitative tier unlocks, deduplicated, in tier order.
    pub tier_unlocks: Vec<String>,
    /// "<relic>: <ability>" call-outs, deduplicated, in pick order.
    pub relic_abilities: Vec<String>,
    pub counted_relics: Vec<CountedRelic>,
}

// ── Aggregation ────────────────────────────────────────────────────

/// Compute the bonus summary with the builtin phrase table.
pub fn compute_summary(state: &SelectionState, catalog: &Catalog) -> BonusSummary {
    compute_summary_with(state, catalog, PatternTable::builtin())
}

/// Compute the bonus summary with a caller-supplied phrase table.
pub fn compute_summary_with(
    state: &SelectionState,
    catalog: &Catalog,
    table: &PatternTable,
) -> BonusSummary {
    let current_tier = clamp_tier(state.current_tier() as i64);

    let (tier_ledger, tier_unlocks) = scan_passives(catalog, table, current_tier);

    let counted = counted_relics(state, catalog, current_tier);
    let mut relic_ledger = Ledger::default();
    let mut relic_abilities = Vec::new();
    for entry in &counted {
        let Some(relic) = catalog.relic(&entry.name) else {
            continue;
        };
        for effect in &relic.effects {
            relic_ledger.scan(&table.relic_effects, effect);
            for label in flags(&table.relic_abilities, effect) {
                push_unique(&mut relic_abilities, format!("{}: {}", relic.name, label));
            }
        }
    }

    let tier = TierTotals {
        paragon_points: tier_ledger.value(Stat::ParagonPoints),
        drop_rate: tier_ledger.value(Stat::DropRate),
        xp_boost: tier_ledger.value(Stat::XpBoost),
        defence_penetration: tier_ledger.value(Stat::DefencePenetration),
        minimum_hit: tier_ledger.value(Stat::MinimumHit),
        pet_chance: tier_ledger.value(Stat::PetChance),
        gather_chance: tier_ledger.value(Stat::GatherChance),
        slayer_picks: tier_ledger.value(Stat::SlayerPicks),
        rune_ammo_save: tier_ledger.value(Stat::RuneAmmoSave),
        npc_aggression: tier_ledger.value(Stat::NpcAggression),
        auto_gathers: tier_ledger.value(Stat::AutoGathers),
    };
    let relic = RelicTotals {
        minimum_hit: relic_ledger.value(Stat::MinimumHit),
        drop_rate: relic_ledger.value(Stat::DropRate),
        xp_boost: relic_ledger.value(Stat::XpBoost),
        slayer_points: relic_ledger.value(Stat::SlayerPoints),
        damage_multiplier: relic_ledger.value(Stat::DamageMultiplier),
        heal_percent: relic_ledger.value(Stat::HealPercent),
    };
    let combined = CombinedTotals {
        drop_rate: tier.drop_rate + relic.drop_rate,
        xp_boost: tier.xp_boost + relic.xp_boost,
        minimum_hit: tier.minimum_hit + relic.minimum_hit,
    };

    tracing::trace!(
        target: "paragon::bonus",
        current_tier,
        relics = counted.len(),
        drop_rate = combined.drop_rate,
        xp_boost = combined.xp_boost,
        "bonus.summary.computed"
    );

    BonusSummary {
        current_tier,
        tier,
        relic,
        combined,
        tier_unlocks,
        relic_abilities,
        counted_relics: counted,
    }
}

/// Scan the passives of every tier up to `through_tier`.
fn scan_passives(catalog: &Catalog, table: &PatternTable, through_tier: u8) -> (Ledger, Vec<String>) {
    let mut ledger = Ledger::default();
    let mut unlocks = Vec::new();
    for meta in catalog.tiers().iter().filter(|t| t.tier <= through_tier) {
        for passive in &meta.passives {
            ledger.scan(&table.passives, passive);
            for label in flags(&table.passive_unlocks, passive) {
                push_unique(&mut unlocks, label.to_string());
            }
        }
    }
    (ledger, unlocks)
}

/// Relics whose effects count at `current_tier`. The pick slot gates a relic,
/// not its catalog tier. Names missing from the catalog are skipped.
fn counted_relics(state: &SelectionState, catalog: &Catalog, current_tier: u8) -> Vec<CountedRelic> {
    let mut counted = Vec::new();
    for t in 1..=MAX_RELIC_TIER.min(current_tier) {
        let Some(name) = state.pick(t) else {
            continue;
        };
        if catalog.relic(name).is_some() {
            counted.push(CountedRelic {
                tier: t,
                name: name.to_string(),
                reloaded: false,
            });
        }
    }

    if current_tier >= RELOADED_TIER && state.pick(RELOADED_TIER) == Some(RELOADED) {
        if let Some(name) = state.reloaded_pick() {
            if catalog.relic(name).is_some() {
                counted.push(CountedRelic {
                    tier: RELOADED_TIER,
                    name: name.to_string(),
                    reloaded: true,
                });
            }
        }
    }
    counted
}

/// XP and drop-rate totals over every tier in the catalog, regardless of
/// progress. Used for the headline KPIs.
pub fn catalog_totals(catalog: &Catalog) -> (f64, f64) {
    let (ledger, _) = scan_passives(catalog, PatternTable::builtin(), crate::catalog::MAX_TIER);
    (ledger.value(Stat::XpBoost), ledger.value(Stat::DropRate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::state::SelectionState;
    use super::patterns::{Amount, FlagSpec, NumericSpec};

    fn state_at(current: i64) -> SelectionState {
        let mut state = SelectionState::new(Catalog::builtin());
        state.set_current_tier(current);
        state
    }

    fn synthetic_catalog(passives: &[&str]) -> Catalog {
        let passives: Vec<String> = passives.iter().map(|p| format!("{:?}", p)).collect();
        let json = format!(
            r#"{{
                "tiers": [{{ "tier": 1, "points": "0", "passives": [{}] }}],
                "relics": [],
                "tier_options": {{}}
            }}"#,
            passives.join(",")
        );
        Catalog::from_json(&json).unwrap()
    }

    #[test]
    fn cumulative_wording_wins_over_incremental() {
        let catalog = synthetic_catalog(&["+25% drop rate", "+50% drop rate (Total of +75%)"]);
        let state = SelectionState::new(&catalog);
        let summary = compute_summary(&state, &catalog);
        assert_eq!(summary.tier.drop_rate, 75.0);
    }

    #[test]
    fn cumulative_takes_maximum_not_last() {
        let catalog = synthetic_catalog(&[
            "+50% XP boost (Total of +150%)",
            "+50% XP boost (Total of +100%)",
        ]);
        let state = SelectionState::new(&catalog);
        assert_eq!(compute_summary(&state, &catalog).tier.xp_boost, 150.0);
    }

    #[test]
    fn unrecognized_text_contributes_nothing() {
        let catalog = synthetic_catalog(&["Something entirely new", "Gain a warm feeling"]);
        let state = SelectionState::new(&catalog);
        let summary = compute_summary(&state, &catalog);
        assert_eq!(summary.tier.drop_rate, 0.0);
        assert_eq!(summary.tier.pet_chance, 1.0);
        assert!(summary.tier_unlocks.is_empty());
    }

    #[test]
    fn tier_one_only_counts_tier_one() {
        let summary = compute_summary(&state_at(1), Catalog::builtin());
        assert_eq!(summary.tier.paragon_points, 5.0);
        assert_eq!(summary.tier.drop_rate, 25.0);
        assert_eq!(summary.tier.xp_boost, 0.0);
        assert_eq!(summary.tier.defence_penetration, 25.0);
        assert_eq!(summary.tier.minimum_hit, 5.0);
        assert_eq!(summary.tier_unlocks, vec!["Auto bank herbs & currency"]);
    }

    #[test]
    fn passives_never_leak_from_higher_tiers() {
        let catalog = Catalog::builtin();
        let mut previous_points = 0.0;
        for current in 1..=8 {
            let summary = compute_summary(&state_at(current), catalog);
            assert!(summary.tier.paragon_points >= previous_points);
            previous_points = summary.tier.paragon_points;
            let has_bonfires = summary.tier_unlocks.iter().any(|u| u == "Bonfires unlocked");
            assert_eq!(has_bonfires, current >= 2, "tier {}", current);
            let has_reset = summary
                .tier_unlocks
                .iter()
                .any(|u| u == "1x perk reset available");
            assert_eq!(has_reset, current == 8, "tier {}", current);
        }
    }

    #[test]
    fn full_progress_tier_totals() {
        let summary = compute_summary(&state_at(8), Catalog::builtin());
        assert_eq!(summary.tier.paragon_points, 5.0 * 5.0 + 150.0 + 150.0);
        assert_eq!(summary.tier.drop_rate, 125.0);
        assert_eq!(summary.tier.xp_boost, 150.0);
        assert_eq!(summary.tier.pet_chance, 2.0);
        assert_eq!(summary.tier.npc_aggression, 5.0);
        assert_eq!(summary.tier.auto_gathers, 2.0);
        assert_eq!(summary.tier.gather_chance, 60.0);
        assert_eq!(summary.tier.slayer_picks, 5.0);
        assert_eq!(summary.tier.rune_ammo_save, 95.0);
        assert_eq!(summary.tier_unlocks.len(), 12);
    }

    #[test]
    fn end_to_end_tier_three() {
        let mut state = state_at(3);
        state.set_pick(1, "Fluid Strikes").unwrap();
        state.set_pick(2, "Endless Harvest").unwrap();
        state.set_pick(3, "Absolute Unit").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.tier.drop_rate, 50.0);
        assert_eq!(summary.relic.drop_rate, 0.0);
        assert_eq!(summary.combined.drop_rate, 50.0);
        assert_eq!(summary.counted_relics.len(), 3);
        assert!(
            summary
                .relic_abilities
                .contains(&"Fluid Strikes: Attack speed 2x".to_string())
        );
        assert!(
            summary
                .relic_abilities
                .contains(&"Endless Harvest: Infinite gathering".to_string())
        );
        assert!(
            summary
                .relic_abilities
                .contains(&"Absolute Unit: HP/Prayer regen".to_string())
        );
    }

    #[test]
    fn damage_multiplier_compounds() {
        let json = r#"{
            "tiers": [{ "tier": 1, "points": "0", "passives": [] }],
            "relics": [
                { "name": "Berserk", "tier": 1, "effects": ["Deal 30% more damage."], "tags": [] },
                { "name": "Rage", "tier": 2, "effects": ["Deal 30% more damage, take more."], "tags": [] }
            ],
            "tier_options": { "1": ["Berserk"], "2": ["Rage"] }
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        let mut state = SelectionState::new(&catalog);
        state.set_current_tier(8);
        let summary = compute_summary(&state, &catalog);
        assert!((summary.relic.damage_multiplier - 1.69).abs() < 1e-9);
    }

    #[test]
    fn ferality_counts_minimum_hit_and_damage() {
        let mut state = state_at(3);
        state.set_pick(3, "Ferality").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.relic.minimum_hit, 5.0);
        assert_eq!(summary.combined.minimum_hit, 10.0);
        assert!((summary.relic.damage_multiplier - 1.3).abs() < 1e-9);
    }

    #[test]
    fn relic_sourced_drop_and_xp_stay_separate() {
        let mut state = state_at(8);
        state.set_pick(4, "Luck Of The Dwarves").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.tier.drop_rate, 125.0);
        assert_eq!(summary.relic.drop_rate, 50.0);
        assert_eq!(summary.combined.drop_rate, 175.0);

        state.set_pick(4, "Prestigious").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.relic.xp_boost, 100.0);
        assert_eq!(summary.combined.xp_boost, 250.0);
    }

    #[test]
    fn reloaded_pick_counts_only_at_tier_five_and_above() {
        let mut state = state_at(8);
        state.set_pick(2, "Endless Harvest").unwrap();
        state.set_pick(5, RELOADED).unwrap();
        state.set_reloaded_pick("Slayer Master").unwrap();

        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.relic.slayer_points, 75.0);
        assert!(summary.counted_relics.iter().any(|r| r.reloaded));

        state.set_current_tier(4);
        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.relic.slayer_points, 0.0);
        assert!(summary.counted_relics.iter().all(|r| !r.reloaded));
        assert_eq!(state.reloaded_pick(), Some("Slayer Master"));
    }

    #[test]
    fn unknown_pick_contributes_zero() {
        let mut state = state_at(8);
        state
            .set_tier_options(1, vec!["Mystery Relic".to_string()])
            .unwrap();
        state.set_pick(1, "Mystery Relic").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        assert!(summary.counted_relics.iter().all(|r| r.name != "Mystery Relic"));
        assert_eq!(summary.relic.minimum_hit, 0.0);
    }

    #[test]
    fn higher_tier_relic_counts_in_lower_slot() {
        let mut state = state_at(3);
        state
            .set_tier_options(2, vec!["Vampyrism".to_string(), "Slayer Master".to_string()])
            .unwrap();
        state.set_pick(2, "Vampyrism").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        assert_eq!(summary.relic.heal_percent, 10.0);
        assert!(
            summary
                .counted_relics
                .iter()
                .any(|r| r.tier == 2 && r.name == "Vampyrism" && !r.reloaded)
        );
    }

    #[test]
    fn custom_phrase_reaches_summary() {
        let passives: &[NumericSpec] = &[
            (r"Gain (\d+) Paragon Points", None, Stat::ParagonPoints, Combine::Sum, Amount::Captured),
            (r"\+(\d+)% luckier drops", None, Stat::DropRate, Combine::Sum, Amount::Captured),
        ];
        let unlocks: &[FlagSpec] = &[(r"moonlit fishing", "Night fishing")];
        let table = PatternTable::from_specs(passives, unlocks, &[], &[]).unwrap();
        let catalog = synthetic_catalog(&[
            "Gain 5 Paragon Points",
            "+30% luckier drops",
            "Unlocks moonlit fishing",
        ]);
        let state = SelectionState::new(&catalog);

        let summary = compute_summary_with(&state, &catalog, &table);
        assert_eq!(summary.tier.paragon_points, 5.0);
        assert_eq!(summary.tier.drop_rate, 30.0);
        assert_eq!(summary.tier_unlocks, vec!["Night fishing"]);

        let builtin = compute_summary(&state, &catalog);
        assert_eq!(builtin.tier.drop_rate, 0.0);
        assert!(builtin.tier_unlocks.is_empty());
    }

    #[test]
    fn later_rune_save_replaces_earlier() {
        let catalog = synthetic_catalog(&[
            "Save 95% of runes/ammo/charges",
            "Save 80% of runes/ammo/charges",
        ]);
        let state = SelectionState::new(&catalog);
        assert_eq!(compute_summary(&state, &catalog).tier.rune_ammo_save, 80.0);
    }

    #[test]
    fn tiers_seven_and_eight_have_no_relic_contribution() {
        let summary = compute_summary(&state_at(8), Catalog::builtin());
        assert!(summary.counted_relics.iter().all(|r| r.tier <= 6));
    }

    #[test]
    fn abilities_are_deduplicated_per_relic() {
        let mut state = state_at(8);
        state.set_pick(4, "Luck Of The Dwarves").unwrap();
        let summary = compute_summary(&state, Catalog::builtin());
        let goblins = summary
            .relic_abilities
            .iter()
            .filter(|a| a.as_str() == "Luck Of The Dwarves: Treasure goblins")
            .count();
        assert_eq!(goblins, 1);
    }

    #[test]
    fn recomputation_is_byte_identical() {
        let mut state = state_at(6);
        state.set_pick(3, "Ferality").unwrap();
        let a = serde_json::to_string(&compute_summary(&state, Catalog::builtin())).unwrap();
        let b = serde_json::to_string(&compute_summary(&state, Catalog::builtin())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn catalog_totals_ignore_progress() {
        let (xp, drop) = catalog_totals(Catalog::builtin());
        assert_eq!(xp, 150.0);
        assert_eq!(drop, 125.0);
    }
}
