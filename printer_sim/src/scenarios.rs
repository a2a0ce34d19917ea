//! Named simulation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: place, fuel, tick, collect, remove
    Lifecycle,

    /// SIM-002: one payout per interval, counter resets
    Accrual,

    /// SIM-003: storage cap and single full notification
    StorageCap,

    /// SIM-004: friends gain and lose access
    Friends,

    /// SIM-005: racing upgrades apply once
    UpgradeRace,

    /// SIM-006: orphaned devices are swept away
    Orphans,

    /// SIM-007: state survives an engine restart
    Restart,

    /// SIM-008: random intents, breaks and restarts with invariant checks
    Chaos,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Lifecycle,
            ScenarioId::Accrual,
            ScenarioId::StorageCap,
            ScenarioId::Friends,
            ScenarioId::UpgradeRace,
            ScenarioId::Orphans,
            ScenarioId::Restart,
            ScenarioId::Chaos,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Lifecycle => "lifecycle",
            ScenarioId::Accrual => "accrual",
            ScenarioId::StorageCap => "storage_cap",
            ScenarioId::Friends => "friends",
            ScenarioId::UpgradeRace => "upgrade_race",
            ScenarioId::Orphans => "orphans",
            ScenarioId::Restart => "restart",
            ScenarioId::Chaos => "chaos",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Lifecycle => "Place, fuel, run ten ticks, collect and remove one device",
            ScenarioId::Accrual => "50s payout over 10s ticks: exactly one payout per five ticks",
            ScenarioId::StorageCap => "Payout clamps at max storage and notifies once until collected",
            ScenarioId::Friends => "A friend can collect; once removed, access is denied",
            ScenarioId::UpgradeRace => "Eight threads upgrade the same device; one succeeds",
            ScenarioId::Orphans => "Broken blocks remove their devices on the next sweep",
            ScenarioId::Restart => "Devices, fuel, earnings and friends survive a restart",
            ScenarioId::Chaos => "Random players, intents, block breaks and restarts",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lifecycle" | "sim-001" => Ok(ScenarioId::Lifecycle),
            "accrual" | "sim-002" => Ok(ScenarioId::Accrual),
            "storage_cap" | "storagecap" | "cap" | "sim-003" => Ok(ScenarioId::StorageCap),
            "friends" | "sim-004" => Ok(ScenarioId::Friends),
            "upgrade_race" | "upgraderace" | "sim-005" => Ok(ScenarioId::UpgradeRace),
            "orphans" | "sim-006" => Ok(ScenarioId::Orphans),
            "restart" | "sim-007" => Ok(ScenarioId::Restart),
            "chaos" | "sim-008" => Ok(ScenarioId::Chaos),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
