//! Static relic catalog — tiers, relics, default tier options and image assets.
//!
//! The builtin catalog is compiled in from `data/paragon_catalog.json` and
//! parsed once. Callers that need corrected content (e.g. a relic's assigned
//! default tier once the wiki reveals it) can load an override document with
//! the same schema via [`Catalog::from_json`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::CatalogError;

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 8;
/// Highest tier that offers a relic choice. Tiers 7 and 8 only grant passives.
pub const MAX_RELIC_TIER: u8 = 6;
pub const MAX_OPTIONS_PER_TIER: usize = 3;

/// The tier 5 relic that unlocks an extra pick from tiers 1–4.
pub const RELOADED: &str = "Reloaded";
pub const RELOADED_TIER: u8 = 5;
/// Tiers whose options may be taken as the Reloaded bonus pick.
pub const RELOADED_SOURCE_TIERS: std::ops::RangeInclusive<u8> = 1..=4;

const BUILTIN_CATALOG: &str = include_str!("data/paragon_catalog.json");
const IMAGE_DIR: &str = "img";

static BUILTIN: Lazy<Catalog> =
    Lazy::new(|| Catalog::from_json(BUILTIN_CATALOG).expect("builtin catalog should parse"));

/// Clamp any integer into the valid tier range.
pub fn clamp_tier(tier: i64) -> u8 {
    tier.clamp(MIN_TIER as i64, MAX_TIER as i64) as u8
}

/// Option names such as "(Unknown relic 1)" stand in for relics not yet revealed.
pub fn is_placeholder(name: &str) -> bool {
    name.starts_with('(')
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub tier: u8,
    /// Point requirement, kept as the display string ("1,400").
    pub points: String,
    pub passives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelicTier {
    Revealed(u8),
    /// Listed as "Unknown Tier" upstream; aggregated as if it belonged to
    /// `assigned_default_tier`.
    Unrevealed { assigned_default_tier: u8 },
}

impl RelicTier {
    /// The tier used when gating and aggregating this relic.
    pub fn effective(&self) -> u8 {
        match *self {
            RelicTier::Revealed(t) => t,
            RelicTier::Unrevealed {
                assigned_default_tier,
            } => assigned_default_tier,
        }
    }

    pub fn label(&self) -> String {
        match self {
            RelicTier::Revealed(t) => format!("Tier {}", t),
            RelicTier::Unrevealed { .. } => "Revealed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relic {
    pub name: String,
    pub tier: RelicTier,
    pub effects: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    tiers: Vec<Tier>,
    relics: Vec<Relic>,
    tier_options: BTreeMap<u8, Vec<String>>,
    images: BTreeMap<String, String>,
}

// ── On-disk schema ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogFile {
    tiers: Vec<TierRecord>,
    relics: Vec<RelicRecord>,
    tier_options: BTreeMap<u8, Vec<String>>,
    #[serde(default)]
    images: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct TierRecord {
    tier: u8,
    points: String,
    #[serde(default)]
    passives: Vec<String>,
}

#[derive(Deserialize)]
struct RelicRecord {
    name: String,
    tier: TierField,
    #[serde(default)]
    assigned_default_tier: Option<u8>,
    #[serde(default)]
    effects: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// `"tier": 3` or `"tier": "reveal"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TierField {
    Number(u8),
    Marker(String),
}

impl Catalog {
    /// The compiled-in catalog.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Parse and validate a catalog document.
    pub fn from_json(data: &str) -> Result<Catalog, CatalogError> {
        let file: CatalogFile = serde_json::from_str(data)?;

        let mut tiers = Vec::with_capacity(file.tiers.len());
        for record in file.tiers {
            if !(MIN_TIER..=MAX_TIER).contains(&record.tier) {
                return Err(CatalogError::Invalid(format!(
                    "tier {} is outside {}..={}",
                    record.tier, MIN_TIER, MAX_TIER
                )));
            }
            if tiers.iter().any(|t: &Tier| t.tier == record.tier) {
                return Err(CatalogError::Invalid(format!(
                    "tier {} is listed twice",
                    record.tier
                )));
            }
            tiers.push(Tier {
                tier: record.tier,
                points: record.points,
                passives: record.passives,
            });
        }
        tiers.sort_by_key(|t| t.tier);

        let mut relics: Vec<Relic> = Vec::with_capacity(file.relics.len());
        for record in file.relics {
            if relics.iter().any(|r| r.name == record.name) {
                return Err(CatalogError::Invalid(format!(
                    "relic \"{}\" is listed twice",
                    record.name
                )));
            }
            let tier = relic_tier(&record)?;
            relics.push(Relic {
                name: record.name,
                tier,
                effects: record.effects,
                tags: record.tags,
            });
        }

        for (tier, options) in &file.tier_options {
            if !(MIN_TIER..=MAX_TIER).contains(tier) {
                return Err(CatalogError::Invalid(format!(
                    "tier options given for tier {}",
                    tier
                )));
            }
            if options.len() > MAX_OPTIONS_PER_TIER {
                return Err(CatalogError::Invalid(format!(
                    "tier {} lists {} options (max {})",
                    tier,
                    options.len(),
                    MAX_OPTIONS_PER_TIER
                )));
            }
        }

        tracing::debug!(
            target: "paragon::catalog",
            tiers = tiers.len(),
            relics = relics.len(),
            "catalog.loaded"
        );

        Ok(Catalog {
            tiers,
            relics,
            tier_options: file.tier_options,
            images: file.images,
        })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, tier: u8) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn relics(&self) -> &[Relic] {
        &self.relics
    }

    /// Look up a relic by name. Placeholders and stale names return `None`.
    pub fn relic(&self, name: &str) -> Option<&Relic> {
        self.relics.iter().find(|r| r.name == name)
    }

    /// The default candidates offered at a tier (empty for unknown tiers).
    pub fn default_options(&self, tier: u8) -> &[String] {
        self.tier_options
            .get(&tier)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn default_tier_options(&self) -> &BTreeMap<u8, Vec<String>> {
        &self.tier_options
    }

    /// Relative path of a relic's icon, e.g. `img/50px-Paragon_wrath.png`.
    pub fn relic_image(&self, name: &str) -> Option<String> {
        self.images
            .get(name)
            .map(|file| format!("{}/{}", IMAGE_DIR, file))
    }
}

fn relic_tier(record: &RelicRecord) -> Result<RelicTier, CatalogError> {
    match &record.tier {
        TierField::Number(t) if (MIN_TIER..=MAX_RELIC_TIER).contains(t) => {
            Ok(RelicTier::Revealed(*t))
        }
        TierField::Number(t) => Err(CatalogError::Invalid(format!(
            "relic \"{}\" has tier {} (relics exist for tiers {}..={})",
            record.name, t, MIN_TIER, MAX_RELIC_TIER
        ))),
        TierField::Marker(m) if m == "reveal" => match record.assigned_default_tier {
            Some(t) if (MIN_TIER..=MAX_RELIC_TIER).contains(&t) => Ok(RelicTier::Unrevealed {
                assigned_default_tier: t,
            }),
            _ => Err(CatalogError::Invalid(format!(
                "unrevealed relic \"{}\" needs an assigned_default_tier in {}..={}",
                record.name, MIN_TIER, MAX_RELIC_TIER
            ))),
        },
        TierField::Marker(m) => Err(CatalogError::Invalid(format!(
            "relic \"{}\" has unknown tier marker \"{}\"",
            record.name, m
        ))),
    }
}
