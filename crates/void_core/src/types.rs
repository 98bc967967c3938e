//! Type definitions for `void_core`.
//!
//! Catalog ids, definition records, tuning constants, events and purchase
//! outcomes shared by every subsystem.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

/// Catalog ids borrow from the static tables, so an id value can only ever
/// name an entry that exists in some catalog.
macro_rules! catalog_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub struct $name(pub &'static str);

        impl $name {
            pub fn as_str(&self) -> &'static str {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.0)
            }
        }
    };
}

catalog_id!(StructureId);
catalog_id!(UpgradeId);

// ---------------------------------------------------------------------------
// Definition types
// ---------------------------------------------------------------------------

/// Which output channel a structure feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputKind {
    /// Void energy per second, credited every tick.
    PassiveResource,
    /// Additive bonus on the structure click multiplier (`1 + bonus`).
    ClickMultiplier,
    /// Automatic clicks per second.
    AutoClick,
}

/// What an upgrade effect targets. Bonuses of the same kind stack additively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EffectKind {
    ClickPower,
    /// Scales the passive-resource channel of every structure.
    StructureOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureDef {
    pub id: StructureId,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: u8,
    pub base_cost: f64,
    /// Cost multiplier per unit already owned. Always > 1.
    pub cost_scaling: f64,
    /// Output per owned unit, interpreted according to `output_kind`.
    pub base_output: f64,
    pub output_kind: OutputKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub base_cost: f64,
    pub cost_scaling: f64,
    /// `None` means the upgrade can be bought forever.
    pub max_level: Option<u32>,
    pub effects: &'static [Effect],
}

impl UpgradeDef {
    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Gameplay constants. Rates are per second, durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub base_click_energy: f64,
    pub max_click_heat: f64,
    pub heat_per_click: f64,
    pub heat_decay_rate: f64,
    pub overheat_cooldown_seconds: f64,
    pub click_efficiency_decay_rate: f64,
    pub click_efficiency_recovery_rate: f64,
    pub min_click_efficiency: f64,
    /// Idle time after a manual click before efficiency starts recovering.
    pub efficiency_recovery_delay_seconds: f64,
    pub autosave_interval_seconds: f64,
}

impl Tuning {
    pub const STANDARD: Tuning = Tuning {
        base_click_energy: 1.0,
        max_click_heat: 100.0,
        heat_per_click: 5.0,
        heat_decay_rate: 15.0,
        overheat_cooldown_seconds: 3.0,
        click_efficiency_decay_rate: 0.05,
        click_efficiency_recovery_rate: 0.25,
        min_click_efficiency: 0.25,
        efficiency_recovery_delay_seconds: 0.1,
        autosave_interval_seconds: 30.0,
    };
}

impl Default for Tuning {
    fn default() -> Self {
        Self::STANDARD
    }
}

// ---------------------------------------------------------------------------
// Outcomes and events
// ---------------------------------------------------------------------------

/// Result of a structure or upgrade purchase attempt. Failure is a value,
/// never an error: nothing changes unless the outcome is `Purchased`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// `level` is the new structure count or upgrade level.
    Purchased { cost: f64, level: u32 },
    Unaffordable { cost: f64 },
    MaxLevel,
    UnknownId,
}

impl PurchaseOutcome {
    pub fn is_purchased(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Core is overheated; nothing changed.
    Rejected,
    Accepted { energy: f64, overheated: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StructurePurchased {
        structure_id: StructureId,
        cost: f64,
        count: u32,
    },
    UpgradePurchased {
        upgrade_id: UpgradeId,
        cost: f64,
        level: u32,
    },
    CoreOverheated {
        cooldown_seconds: f64,
    },
    CoreCooled,
    AutoClicksResolved {
        clicks: u64,
        energy: f64,
    },
    SnapshotLoaded {
        warnings: usize,
    },
    GameReset,
    PrestigeReset,
    Saved {
        last_save_time: Option<u64>,
    },
    SaveFailed {
        reason: String,
    },
}
