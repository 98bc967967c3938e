//! Upgrade progress and bonus aggregation.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{Catalog, EffectKind, PurchaseOutcome, Snapshot, UpgradeDef, UpgradeId, Wallet};

/// `floor(base_cost × cost_scaling^level)`, or `None` once the max level is reached.
pub fn upgrade_cost(def: &UpgradeDef, level: u32) -> Option<f64> {
    if def.max_level.is_some_and(|max| level >= max) {
        return None;
    }
    let exponent = i32::try_from(level).unwrap_or(i32::MAX);
    Some((def.base_cost * def.cost_scaling.powi(exponent)).floor())
}

#[derive(Debug, Clone)]
pub struct UpgradeProgress {
    catalog: Catalog,
    levels: BTreeMap<UpgradeId, u32>,
}

impl UpgradeProgress {
    pub fn new(catalog: Catalog) -> Self {
        let levels = catalog.upgrades().iter().map(|def| (def.id, 0)).collect();
        Self { catalog, levels }
    }

    pub fn level(&self, id: &str) -> u32 {
        self.catalog
            .upgrade(id)
            .and_then(|def| self.levels.get(&def.id))
            .copied()
            .unwrap_or(0)
    }

    pub fn levels(&self) -> &BTreeMap<UpgradeId, u32> {
        &self.levels
    }

    /// Unknown ids are never at max level; they simply cannot be bought.
    pub fn is_max_level(&self, id: &str) -> bool {
        self.catalog
            .upgrade(id)
            .is_some_and(|def| upgrade_cost(def, self.level(id)).is_none())
    }

    /// Cost of the next level; `f64::INFINITY` at max level or for unknown ids.
    pub fn cost_for_next_level(&self, id: &str) -> f64 {
        let Some(def) = self.catalog.upgrade(id) else {
            warn!(upgrade_id = id, "cost requested for unknown upgrade");
            return f64::INFINITY;
        };
        upgrade_cost(def, self.level(id)).unwrap_or(f64::INFINITY)
    }

    pub fn purchase(&mut self, id: &str, wallet: &mut impl Wallet) -> PurchaseOutcome {
        let Some(def) = self.catalog.upgrade(id) else {
            warn!(upgrade_id = id, "purchase requested for unknown upgrade");
            return PurchaseOutcome::UnknownId;
        };
        let level = self.levels.get(&def.id).copied().unwrap_or(0);
        let Some(cost) = upgrade_cost(def, level) else {
            debug!(upgrade_id = id, level, "upgrade already at max level");
            return PurchaseOutcome::MaxLevel;
        };
        if !wallet.debit(cost) {
            debug!(upgrade_id = id, cost, "cannot afford upgrade");
            return PurchaseOutcome::Unaffordable { cost };
        }
        let new_level = level.saturating_add(1);
        self.levels.insert(def.id, new_level);
        debug!(upgrade_id = id, cost, level = new_level, "upgrade purchased");
        PurchaseOutcome::Purchased {
            cost,
            level: new_level,
        }
    }

    /// Sum of `effect.value × level` over every purchased upgrade carrying
    /// an effect of `kind`. Bonuses scale linearly with level.
    pub fn total_bonus(&self, kind: EffectKind) -> f64 {
        self.catalog
            .upgrades()
            .iter()
            .filter_map(|def| {
                let level = self.levels.get(&def.id).copied().unwrap_or(0);
                (level > 0).then_some((def, level))
            })
            .flat_map(|(def, level)| {
                def.effects
                    .iter()
                    .filter(move |effect| effect.kind == kind)
                    .map(move |effect| effect.value * f64::from(level))
            })
            .sum()
    }

    /// Levels above a definition's max are clamped; validation already warned.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        for def in self.catalog.upgrades() {
            let saved = snapshot.upgrades.get(def.id.as_str()).copied().unwrap_or(0);
            let level = def.max_level.map_or(saved, |max| saved.min(max));
            self.levels.insert(def.id, level);
        }
    }

    pub fn prepare_snapshot(&self, draft: &mut Snapshot) {
        for (id, level) in &self.levels {
            draft.upgrades.insert(id.as_str().to_string(), *level);
        }
    }

    pub fn reset(&mut self) {
        for level in self.levels.values_mut() {
            *level = 0;
        }
    }
}
