//! Tier Catalog - the ordered, immutable table of device tiers.
//!
//! Tier numbers are dense: 1, 2, ..., N. The catalog is built once from
//! configuration and only ever replaced wholesale on reload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One rank of device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDefinition {
    /// Tier number (1-based)
    pub tier: u32,

    /// Display name (e.g., "Basic Printer")
    pub name: String,

    /// Currency paid into storage per payout interval
    pub earnings_rate: f64,

    /// Cost to reach this tier from a lower one
    pub upgrade_cost: f64,

    /// Optional visual identifier for the presenter (block or texture id)
    pub icon: Option<String>,
}

impl TierDefinition {
    /// Creates a tier definition without a visual identifier.
    pub fn new(tier: u32, name: impl Into<String>, earnings_rate: f64, upgrade_cost: f64) -> Self {
        Self {
            tier,
            name: name.into(),
            earnings_rate,
            upgrade_cost,
            icon: None,
        }
    }
}

/// Immutable lookup table of tier definitions.
///
/// Invariant: `tiers[i].tier == i + 1` and the table is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TierCatalog {
    tiers: Vec<TierDefinition>,
}

impl TierCatalog {
    /// The built-in catalog used when configuration yields no usable tier.
    pub fn builtin() -> Self {
        Self {
            tiers: vec![
                TierDefinition::new(1, "Basic Printer", 10.0, 0.0),
                TierDefinition::new(2, "Advanced Printer", 20.0, 500.0),
                TierDefinition::new(3, "Superior Printer", 35.0, 1500.0),
                TierDefinition::new(4, "Elite Printer", 50.0, 2500.0),
            ],
        }
    }

    /// Builds a catalog from definitions keyed by tier number.
    ///
    /// Keeps the contiguous run starting at tier 1; anything after the first
    /// gap is dropped with a warning. Falls back to [`TierCatalog::builtin`]
    /// if nothing survives.
    pub fn from_definitions(definitions: BTreeMap<u32, TierDefinition>) -> Self {
        let mut tiers = Vec::with_capacity(definitions.len());

        for (number, mut definition) in definitions {
            let expected = tiers.len() as u32 + 1;
            if number != expected {
                warn!(tier = number, expected, "Tier sequence has a gap; dropping tier");
                continue;
            }
            definition.tier = number;
            tiers.push(definition);
        }

        if tiers.is_empty() {
            warn!("No valid tiers configured; using built-in catalog");
            return Self::builtin();
        }

        Self { tiers }
    }

    /// Looks up a tier by number.
    pub fn definition(&self, tier: u32) -> Option<&TierDefinition> {
        let index = (tier as usize).checked_sub(1)?;
        self.tiers.get(index)
    }

    /// Returns the highest tier number (N).
    pub fn highest_tier(&self) -> u32 {
        self.tiers.len() as u32
    }

    /// Returns the successor of `tier`, or None if `tier` is terminal.
    pub fn next_tier(&self, tier: u32) -> Option<&TierDefinition> {
        self.definition(tier.checked_add(1)?)
    }

    /// Returns true if `tier` is a valid tier number.
    pub fn contains(&self, tier: u32) -> bool {
        self.definition(tier).is_some()
    }

    /// Earnings rate for a device at `tier`.
    ///
    /// A device can outlive its tier across a reload that shrinks the
    /// catalog; such devices earn at the highest remaining tier's rate.
    pub fn earnings_rate(&self, tier: u32) -> f64 {
        self.definition(tier)
            .or_else(|| self.tiers.last())
            .map(|def| def.earnings_rate)
            .unwrap_or(0.0)
    }

    /// Iterates definitions in ascending tier order.
    pub fn iter(&self) -> impl Iterator<Item = &TierDefinition> {
        self.tiers.iter()
    }

    /// Number of tiers (same as `highest_tier`).
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
