//! Static structure and upgrade tables.
//!
//! Definitions live in `const` slices, so they are fixed for the life of the
//! process. A [`Catalog`] is a cheap `Copy` view over a pair of tables; the
//! standard game uses [`Catalog::STANDARD`], tests may build their own.

use std::collections::HashSet;

use crate::{Effect, EffectKind, OutputKind, StructureDef, StructureId, UpgradeDef, UpgradeId};

pub const STRUCTURES: &[StructureDef] = &[
    StructureDef {
        id: StructureId("crystalNode"),
        name: "Crystal Node",
        description: "Generates a small amount of Void Energy passively.",
        tier: 1,
        base_cost: 10.0,
        cost_scaling: 1.15,
        base_output: 0.1,
        output_kind: OutputKind::PassiveResource,
    },
    StructureDef {
        id: StructureId("fluxShard"),
        name: "Flux Shard",
        description: "Passively increases energy gained from clicks.",
        tier: 1,
        base_cost: 50.0,
        cost_scaling: 1.25,
        // +2% click multiplier per shard
        base_output: 0.02,
        output_kind: OutputKind::ClickMultiplier,
    },
    StructureDef {
        id: StructureId("gravityWell"),
        name: "Gravity Well",
        description: "Automatically clicks the Void Core once per second.",
        tier: 2,
        base_cost: 250.0,
        cost_scaling: 1.20,
        base_output: 1.0,
        output_kind: OutputKind::AutoClick,
    },
];

pub const UPGRADES: &[UpgradeDef] = &[
    UpgradeDef {
        id: UpgradeId("clickPower_1"),
        name: "Reinforce Core Matrix",
        description: "Increases base energy gained per click by 25%.",
        base_cost: 25.0,
        cost_scaling: 2.5,
        max_level: Some(5),
        effects: &[Effect {
            kind: EffectKind::ClickPower,
            value: 0.25,
        }],
    },
    UpgradeDef {
        id: UpgradeId("crystalHarmonics"),
        name: "Crystal Harmonics",
        description: "Increases passive energy output of all structures by 10%.",
        base_cost: 500.0,
        cost_scaling: 3.0,
        max_level: Some(3),
        effects: &[Effect {
            kind: EffectKind::StructureOutput,
            value: 0.10,
        }],
    },
];

#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    structures: &'static [StructureDef],
    upgrades: &'static [UpgradeDef],
}

impl Catalog {
    pub const STANDARD: Catalog = Catalog::new(STRUCTURES, UPGRADES);

    pub const fn new(
        structures: &'static [StructureDef],
        upgrades: &'static [UpgradeDef],
    ) -> Self {
        Self {
            structures,
            upgrades,
        }
    }

    pub fn structures(&self) -> &'static [StructureDef] {
        self.structures
    }

    pub fn upgrades(&self) -> &'static [UpgradeDef] {
        self.upgrades
    }

    pub fn structure(&self, id: &str) -> Option<&'static StructureDef> {
        self.structures.iter().find(|def| def.id.0 == id)
    }

    pub fn upgrade(&self, id: &str) -> Option<&'static UpgradeDef> {
        self.upgrades.iter().find(|def| def.id.0 == id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Validates catalog invariants, panicking on any authoring error.
///
/// Catches mistakes like a non-growing cost curve, a negative output, a zero
/// max level, or two entries sharing an id.
pub fn validate_catalog(catalog: &Catalog) {
    let mut structure_ids = HashSet::new();
    for def in catalog.structures() {
        assert!(!def.id.0.is_empty(), "structure has empty id");
        assert!(
            structure_ids.insert(def.id),
            "duplicate structure id '{}'",
            def.id
        );
        assert!(
            def.base_cost.is_finite() && def.base_cost > 0.0,
            "structure '{}' base cost must be > 0, got {}",
            def.id,
            def.base_cost
        );
        assert!(
            def.cost_scaling.is_finite() && def.cost_scaling > 1.0,
            "structure '{}' cost scaling must be > 1, got {}",
            def.id,
            def.cost_scaling
        );
        assert!(
            def.base_output.is_finite() && def.base_output >= 0.0,
            "structure '{}' base output must be >= 0, got {}",
            def.id,
            def.base_output
        );
    }

    let mut upgrade_ids = HashSet::new();
    for def in catalog.upgrades() {
        assert!(!def.id.0.is_empty(), "upgrade has empty id");
        assert!(upgrade_ids.insert(def.id), "duplicate upgrade id '{}'", def.id);
        assert!(
            def.base_cost.is_finite() && def.base_cost > 0.0,
            "upgrade '{}' base cost must be > 0, got {}",
            def.id,
            def.base_cost
        );
        assert!(
            def.cost_scaling.is_finite() && def.cost_scaling >= 1.0,
            "upgrade '{}' cost scaling must be >= 1, got {}",
            def.id,
            def.cost_scaling
        );
        assert!(
            def.max_level != Some(0),
            "upgrade '{}' max level must be >= 1",
            def.id
        );
        assert!(
            !def.effects.is_empty(),
            "upgrade '{}' has no effects",
            def.id
        );
    }
}
