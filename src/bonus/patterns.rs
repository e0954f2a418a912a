//! Recognized-phrase table for bonus extraction.
//!
//! Passive and effect descriptions are free text. Each rule pairs a
//! case-insensitive regex with the stat it feeds and how repeated matches
//! combine. New phrasings are added here; the fold in `bonus::mod` never
//! changes for them.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Numeric stats the summary tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stat {
    ParagonPoints,
    DropRate,
    XpBoost,
    DefencePenetration,
    MinimumHit,
    PetChance,
    GatherChance,
    SlayerPicks,
    RuneAmmoSave,
    NpcAggression,
    AutoGathers,
    SlayerPoints,
    HealPercent,
    DamageMultiplier,
}

impl Stat {
    /// Value of a stat nothing contributed to: 1 for multipliers, 0 otherwise.
    pub fn neutral(self) -> f64 {
        match self {
            Stat::PetChance | Stat::NpcAggression | Stat::AutoGathers | Stat::DamageMultiplier => {
                1.0
            }
            _ => 0.0,
        }
    }
}

/// How a matched amount folds into its stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Added to the running sum.
    Sum,
    /// "(Total of +N%)" wording. The largest one seen replaces the sum of
    /// incremental matches for the stat.
    TotalOf,
    /// Multiplied into the stat's factor (`2x`, `5x`).
    Multiply,
    /// Percentage applied as a factor of `1 + n / 100`.
    CompoundPercent,
    /// Replaces whatever was recorded before.
    LastWrite,
}

/// Where the rule's amount comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    /// First capture group, parsed as a number.
    Captured,
    /// A fixed amount, for phrasings like "Gain double XP" (+100%).
    Fixed(f64),
}

#[derive(Debug, Clone)]
pub struct NumericRule {
    pattern: Regex,
    /// Text that disqualifies an otherwise matching description.
    unless: Option<Regex>,
    pub stat: Stat,
    pub combine: Combine,
    pub amount: Amount,
}

impl NumericRule {
    /// The amount this rule extracts from `text`, if it applies.
    pub fn extract(&self, text: &str) -> Option<f64> {
        if self.unless.as_ref().is_some_and(|re| re.is_match(text)) {
            return None;
        }
        let caps = self.pattern.captures(text)?;
        match self.amount {
            Amount::Fixed(v) => Some(v),
            Amount::Captured => caps.get(1)?.as_str().parse().ok(),
        }
    }
}

/// A phrase that marks a qualitative ability or unlock.
#[derive(Debug, Clone)]
pub struct FlagRule {
    pattern: Regex,
    pub label: String,
}

impl FlagRule {
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Declarative form of a numeric rule: (pattern, unless, stat, combine, amount).
pub type NumericSpec = (&'static str, Option<&'static str>, Stat, Combine, Amount);
/// Declarative form of a flag rule: (pattern, label).
pub type FlagSpec = (&'static str, &'static str);

const PASSIVE_RULES: &[NumericSpec] = &[
    (r"Gain (\d+) Paragon Points", None, Stat::ParagonPoints, Combine::Sum, Amount::Captured),
    (r"drop rate.*\(Total of \+(\d+)%\)", None, Stat::DropRate, Combine::TotalOf, Amount::Captured),
    (r"^\+(\d+)% drop rate", Some(r"Total of"), Stat::DropRate, Combine::Sum, Amount::Captured),
    (r"XP boost\s*\(Total of \+(\d+)%\)", None, Stat::XpBoost, Combine::TotalOf, Amount::Captured),
    (r"^\+(\d+)% XP boost$", None, Stat::XpBoost, Combine::Sum, Amount::Captured),
    (r"\+(\d+)% more defence penetration", None, Stat::DefencePenetration, Combine::Sum, Amount::Captured),
    (r"\+(\d+) minimum hit", None, Stat::MinimumHit, Combine::Sum, Amount::Captured),
    (r"(\d+)x chance to receive Pets", None, Stat::PetChance, Combine::Multiply, Amount::Captured),
    (r"\+(\d+)% chance to successfully gather", None, Stat::GatherChance, Combine::Sum, Amount::Captured),
    (r"\+(\d+) slayer task picks", None, Stat::SlayerPicks, Combine::Sum, Amount::Captured),
    (r"Save (\d+)% of runes/ammo/charges", None, Stat::RuneAmmoSave, Combine::LastWrite, Amount::Captured),
    (r"NPC aggression lasts (\d+)x longer", None, Stat::NpcAggression, Combine::Multiply, Amount::Captured),
    (r"(\d+)x the amount of automatic gathers", None, Stat::AutoGathers, Combine::Multiply, Amount::Captured),
];

const PASSIVE_UNLOCKS: &[FlagSpec] = &[
    (r"Auto bank all herbs and currency", "Auto bank herbs & currency"),
    (r"Auto bank all keys, slayer parts", "Auto bank keys, slayer parts & boxes"),
    (r"Unlock bonfires", "Bonfires unlocked"),
    (r"Spirit of Seren", "1% Spirit of Seren spawn when gathering"),
    (r"60% chance to save 10% of resources", "60% chance to save 10% crafting resources"),
    (r"Banker's note", "Banker's note access"),
    (r"Gather noted resources", "Gather noted resources"),
    (r"Craft 3 extra runes", "+3 runes per essence"),
    (r"Toxic orbs are not consumed", "Toxic orbs not consumed"),
    (r"Ignis teleport scrolls are not consumed", "Ignis teleports not consumed"),
    (r"ToA Warden without your key", "ToA Warden key not consumed"),
    (r"1-off singular perk reset", "1x perk reset available"),
];

const RELIC_RULES: &[NumericSpec] = &[
    (r"\+(\d+) minimum hit", None, Stat::MinimumHit, Combine::Sum, Amount::Captured),
    (r"(\d+)% increased drop rate", None, Stat::DropRate, Combine::Sum, Amount::Captured),
    (r"Deal (\d+)% more damage", None, Stat::DamageMultiplier, Combine::CompoundPercent, Amount::Captured),
    (r"Gain double XP", None, Stat::XpBoost, Combine::Sum, Amount::Fixed(100.0)),
    (r"(?:Gain |\+)(\d+)% more Slayer points", None, Stat::SlayerPoints, Combine::Sum, Amount::Captured),
    (r"Heal for (\d+)% of damage dealt", None, Stat::HealPercent, Combine::Sum, Amount::Captured),
];

const RELIC_ABILITIES: &[FlagSpec] = &[
    (r"2x faster", "Attack speed 2x"),
    (r"Infinitely repeat gathering|Repeat gathering actions indefinitely", "Infinite gathering"),
    (r"immediately crafting all queued|craft queued items immediately", "Instant crafting"),
    (r"infinitely pick (?:your )?Slayer tasks", "Infinite slayer picks"),
    (r"Summon.*Bloodworm.*Guardian", "Combat pets"),
    (r"Passively regenerate|Regenerate \d+% max HP", "HP/Prayer regen"),
    (r"flurry of attacks|unleash flurry", "Attack flurry proc"),
    (r"clues.*10x the regular rate", "10x clue rate"),
    (r"roll twice on any loot", "Double loot rolls"),
    (r"treasure goblin", "Treasure goblins"),
    (r"Holy hammers spin", "Holy hammers"),
    (r"automatically harvested and replanted|auto-harvest and replant", "Auto farming"),
    (r"All loot is automatically banked|All loot auto-banked", "Auto loot banking"),
    (r"Ignore all damage reduction", "Bypass damage reduction"),
    (r"Sage's axe", "Sage's axe (1000 dmg execute)"),
];

static BUILTIN: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::from_specs(PASSIVE_RULES, PASSIVE_UNLOCKS, RELIC_RULES, RELIC_ABILITIES)
        .expect("builtin bonus patterns should compile")
});

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn numeric_rules(specs: &[NumericSpec]) -> Result<Vec<NumericRule>, regex::Error> {
    specs
        .iter()
        .map(|&(pattern, unless, stat, combine, amount)| {
            Ok(NumericRule {
                pattern: compile(pattern)?,
                unless: unless.map(compile).transpose()?,
                stat,
                combine,
                amount,
            })
        })
        .collect()
}

fn flag_rules(specs: &[FlagSpec]) -> Result<Vec<FlagRule>, regex::Error> {
    specs
        .iter()
        .map(|&(pattern, label)| {
            Ok(FlagRule {
                pattern: compile(pattern)?,
                label: label.to_string(),
            })
        })
        .collect()
}

/// All rules the engine applies, split by source.
#[derive(Debug, Clone)]
pub struct PatternTable {
    pub passives: Vec<NumericRule>,
    pub passive_unlocks: Vec<FlagRule>,
    pub relic_effects: Vec<NumericRule>,
    pub relic_abilities: Vec<FlagRule>,
}

impl PatternTable {
    pub fn builtin() -> &'static PatternTable {
        &BUILTIN
    }

    pub fn from_specs(
        passives: &[NumericSpec],
        passive_unlocks: &[FlagSpec],
        relic_effects: &[NumericSpec],
        relic_abilities: &[FlagSpec],
    ) -> Result<PatternTable, regex::Error> {
        Ok(PatternTable {
            passives: numeric_rules(passives)?,
            passive_unlocks: flag_rules(passive_unlocks)?,
            relic_effects: numeric_rules(relic_effects)?,
            relic_abilities: flag_rules(relic_abilities)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passive(stat: Stat, combine: Combine) -> &'static NumericRule {
        PatternTable::builtin()
            .passives
            .iter()
            .find(|r| r.stat == stat && r.combine == combine)
            .unwrap()
    }

    #[test]
    fn builtin_table_compiles() {
        let table = PatternTable::builtin();
        assert_eq!(table.passives.len(), PASSIVE_RULES.len());
        assert_eq!(table.relic_abilities.len(), RELIC_ABILITIES.len());
    }

    #[test]
    fn incremental_drop_rate_skips_total_wording() {
        let rule = passive(Stat::DropRate, Combine::Sum);
        assert_eq!(rule.extract("+25% drop rate bonus"), Some(25.0));
        assert_eq!(rule.extract("+25% drop rate (Total of +50%)"), None);
    }

    #[test]
    fn cumulative_drop_rate_captures_total() {
        let rule = passive(Stat::DropRate, Combine::TotalOf);
        assert_eq!(rule.extract("+25% drop rate (Total of +50%)"), Some(50.0));
        assert_eq!(rule.extract("+75% drop rate"), None);
    }

    #[test]
    fn incremental_xp_is_anchored() {
        let rule = passive(Stat::XpBoost, Combine::Sum);
        assert_eq!(rule.extract("+50% XP boost"), Some(50.0));
        assert_eq!(rule.extract("+50% XP boost (Total of +100%)"), None);
    }

    #[test]
    fn matching_ignores_case() {
        let rule = passive(Stat::NpcAggression, Combine::Multiply);
        assert_eq!(rule.extract("npc AGGRESSION lasts 5X longer"), Some(5.0));
    }

    #[test]
    fn fixed_amount_for_double_xp() {
        let rule = PatternTable::builtin()
            .relic_effects
            .iter()
            .find(|r| r.stat == Stat::XpBoost)
            .unwrap();
        assert_eq!(rule.extract("Gain double XP."), Some(100.0));
        assert_eq!(rule.extract("25% double resource (double XP)."), None);
    }

    #[test]
    fn slayer_points_accepts_both_wordings() {
        let rule = PatternTable::builtin()
            .relic_effects
            .iter()
            .find(|r| r.stat == Stat::SlayerPoints)
            .unwrap();
        assert_eq!(rule.extract("Gain 40% more Slayer points"), Some(40.0));
        assert_eq!(
            rule.extract("+75% more Slayer points on task completion; +60% more points for task streaks."),
            Some(75.0)
        );
    }

    #[test]
    fn bad_custom_pattern_is_an_error() {
        let bad: &[FlagSpec] = &[(r"(unclosed", "Broken")];
        assert!(PatternTable::from_specs(&[], bad, &[], &[]).is_err());
    }
}
