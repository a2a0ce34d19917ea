//! Engine configuration.
//!
//! The raw form mirrors the operator-facing JSON file section by section.
//! It is resolved exactly once into a [`PrinterConfig`]: every missing or
//! invalid entry is replaced by its documented default (with a warning),
//! so the engine never re-validates at access time.

use crate::tiers::{TierCatalog, TierDefinition};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_MAX_PER_OWNER: u32 = 1;
pub const DEFAULT_FUEL_RESOURCE: &str = "PAPER";
pub const DEFAULT_FUEL_MINUTES_PER_ITEM: u64 = 5;
pub const DEFAULT_MAX_FUEL_MINUTES: u64 = 60;
pub const DEFAULT_PAYOUT_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_MAX_STORAGE: f64 = 10_000.0;
pub const DEFAULT_TICK_SECS: u64 = 10;
pub const DEFAULT_TIER_EARNINGS: f64 = 10.0;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// RAW (operator-facing) FORM
// ============================================================================

/// Configuration file as written by the operator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub settings: RawSettings,
    pub fuel: RawFuel,
    pub money: RawMoney,
    pub notifications: RawNotifications,
    pub tiers: Option<BTreeMap<String, RawTier>>,
    pub tick_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub max_printers_per_player: Option<i64>,
    pub disabled_worlds: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFuel {
    pub material: Option<String>,
    pub minutes_per_item: Option<i64>,
    pub max_fuel_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMoney {
    pub generation_interval_minutes: Option<i64>,
    pub max_storage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawNotifications {
    pub fuel_empty: Option<bool>,
    pub storage_full: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTier {
    pub name: Option<String>,
    pub block: Option<String>,
    pub skull_texture: Option<String>,
    pub earnings: Option<f64>,
    pub upgrade_cost: Option<f64>,
}

// ============================================================================
// RESOLVED FORM
// ============================================================================

/// Validated, strongly-typed engine configuration.
///
/// Treated as an immutable snapshot between reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterConfig {
    /// Maximum devices a non-admin may own
    pub max_per_owner: u32,

    /// Worlds where placement is refused
    pub disabled_worlds: BTreeSet<String>,

    /// Inventory resource consumed by AddFuel
    pub fuel_resource: String,

    /// Fuel seconds granted per resource unit
    pub fuel_per_item_secs: u64,

    /// Fuel cap in seconds
    pub max_fuel_secs: u64,

    /// Simulated time between payouts
    pub payout_interval_secs: u64,

    /// Stored earnings cap
    pub max_storage: f64,

    pub notify_fuel_empty: bool,
    pub notify_storage_full: bool,

    /// Sweep period in seconds
    pub tick_secs: u64,

    /// Active tier table
    pub tiers: TierCatalog,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            max_per_owner: DEFAULT_MAX_PER_OWNER,
            disabled_worlds: BTreeSet::new(),
            fuel_resource: DEFAULT_FUEL_RESOURCE.to_string(),
            fuel_per_item_secs: DEFAULT_FUEL_MINUTES_PER_ITEM * 60,
            max_fuel_secs: DEFAULT_MAX_FUEL_MINUTES * 60,
            payout_interval_secs: DEFAULT_PAYOUT_INTERVAL_MINUTES * 60,
            max_storage: DEFAULT_MAX_STORAGE,
            notify_fuel_empty: true,
            notify_storage_full: true,
            tick_secs: DEFAULT_TICK_SECS,
            tiers: TierCatalog::builtin(),
        }
    }
}

impl PrinterConfig {
    /// Reads and resolves a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), tiers = config.tiers.len(), "Configuration loaded");
        Ok(config)
    }

    /// Parses and resolves a JSON configuration document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    /// Resolves the raw form, substituting defaults for invalid entries.
    pub fn from_raw(raw: RawConfig) -> Self {
        let max_per_owner = match raw.settings.max_printers_per_player {
            None => DEFAULT_MAX_PER_OWNER,
            Some(n) if n >= 0 && n <= u32::MAX as i64 => n as u32,
            Some(n) => {
                warn!(value = n, "Invalid max_printers_per_player; using default");
                DEFAULT_MAX_PER_OWNER
            }
        };

        let fuel_resource = match raw.fuel.material {
            None => DEFAULT_FUEL_RESOURCE.to_string(),
            Some(name) => match normalize_identifier(&name) {
                Some(id) => id,
                None => {
                    warn!(material = %name, "Invalid fuel material; using {}", DEFAULT_FUEL_RESOURCE);
                    DEFAULT_FUEL_RESOURCE.to_string()
                }
            },
        };

        let fuel_per_item_secs =
            minutes_to_secs("fuel.minutes_per_item", raw.fuel.minutes_per_item, DEFAULT_FUEL_MINUTES_PER_ITEM);
        let max_fuel_secs =
            minutes_to_secs("fuel.max_fuel_minutes", raw.fuel.max_fuel_minutes, DEFAULT_MAX_FUEL_MINUTES);
        let payout_interval_secs = minutes_to_secs(
            "money.generation_interval_minutes",
            raw.money.generation_interval_minutes,
            DEFAULT_PAYOUT_INTERVAL_MINUTES,
        );

        let max_storage = match raw.money.max_storage {
            None => DEFAULT_MAX_STORAGE,
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(v) => {
                warn!(value = v, "Invalid money.max_storage; using default");
                DEFAULT_MAX_STORAGE
            }
        };

        let tick_secs = match raw.tick_secs {
            None => DEFAULT_TICK_SECS,
            Some(n) if n > 0 => n as u64,
            Some(n) => {
                warn!(value = n, "Invalid tick_secs; using default");
                DEFAULT_TICK_SECS
            }
        };

        let tiers = match raw.tiers {
            None => {
                warn!("No tiers configured; using built-in catalog");
                TierCatalog::builtin()
            }
            Some(raw_tiers) => TierCatalog::from_definitions(resolve_tiers(raw_tiers)),
        };

        let disabled_worlds = raw.settings.disabled_worlds.into_iter().collect();

        Self {
            max_per_owner,
            disabled_worlds,
            fuel_resource,
            fuel_per_item_secs,
            max_fuel_secs,
            payout_interval_secs,
            max_storage,
            notify_fuel_empty: raw.notifications.fuel_empty.unwrap_or(true),
            notify_storage_full: raw.notifications.storage_full.unwrap_or(true),
            tick_secs,
            tiers,
        }
    }

    /// Checks a directly constructed configuration.
    ///
    /// Configs produced by [`PrinterConfig::from_raw`] always pass.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid("tick_secs must be positive".into()));
        }
        if self.payout_interval_secs == 0 {
            return Err(ConfigError::Invalid("payout interval must be positive".into()));
        }
        if self.max_fuel_secs == 0 {
            return Err(ConfigError::Invalid("max fuel must be positive".into()));
        }
        if !(self.max_storage.is_finite() && self.max_storage >= 0.0) {
            return Err(ConfigError::Invalid("max storage must be a non-negative amount".into()));
        }
        if self.tiers.is_empty() {
            return Err(ConfigError::Invalid("tier catalog is empty".into()));
        }
        Ok(self)
    }

    /// Sweep period.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    /// Number of sweeps per payout; an interval shorter than one sweep pays every sweep.
    pub fn ticks_per_payout(&self) -> u64 {
        (self.payout_interval_secs / self.tick_secs.max(1)).max(1)
    }

    /// Payout interval rounded down to whole sweeps.
    pub fn effective_payout_secs(&self) -> u64 {
        self.ticks_per_payout() * self.tick_secs
    }

    /// Returns true if placement is refused in `world`.
    pub fn is_world_disabled(&self, world: &str) -> bool {
        self.disabled_worlds.contains(world)
    }
}

/// Resolves a duration configured in minutes to seconds.
fn minutes_to_secs(field: &str, value: Option<i64>, default_minutes: u64) -> u64 {
    let default = default_minutes * 60;
    match value {
        None => default,
        Some(n) if n > 0 => match (n as u64).checked_mul(60) {
            Some(secs) => secs,
            None => {
                warn!(field, value = n, "Duration too large; using default of {} minutes", default_minutes);
                default
            }
        },
        Some(n) => {
            warn!(field, value = n, "Non-positive duration; using default of {} minutes", default_minutes);
            default
        }
    }
}

/// Upper-cases a resource identifier and checks it is `[A-Z0-9_]+`.
fn normalize_identifier(name: &str) -> Option<String> {
    let upper = name.trim().to_ascii_uppercase();
    let valid = !upper.is_empty()
        && upper.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(upper)
}

fn resolve_tiers(raw_tiers: BTreeMap<String, RawTier>) -> BTreeMap<u32, TierDefinition> {
    let mut definitions = BTreeMap::new();

    for (key, raw) in raw_tiers {
        let number = match key.trim().parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(key = %key, "Invalid tier number; dropping tier");
                continue;
            }
        };

        let earnings_rate = non_negative(number, "earnings", raw.earnings.unwrap_or(DEFAULT_TIER_EARNINGS));
        let upgrade_cost = non_negative(number, "upgrade_cost", raw.upgrade_cost.unwrap_or(0.0));

        let icon = match (raw.skull_texture.filter(|t| !t.is_empty()), raw.block) {
            (Some(texture), _) => Some(texture),
            (None, Some(block)) => {
                let normalized = normalize_identifier(&block);
                if normalized.is_none() {
                    warn!(tier = number, block = %block, "Invalid block for tier; ignoring");
                }
                normalized
            }
            (None, None) => None,
        };

        definitions.insert(
            number,
            TierDefinition {
                tier: number,
                name: raw.name.unwrap_or_else(|| format!("Tier {}", number)),
                earnings_rate,
                upgrade_cost,
                icon,
            },
        );
    }

    definitions
}

fn non_negative(tier: u32, field: &str, value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(tier, field, value, "Negative or non-finite tier amount; using 0");
        0.0
    }
}
