//! Structure ownership: per-structure counts, purchase pricing, and the
//! three aggregated output channels.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    Catalog, OutputKind, PurchaseOutcome, Snapshot, StructureDef, StructureId, StructureRecord,
    Wallet,
};

/// Aggregated output of every owned structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StructureOutputs {
    /// Void energy per second, including the structure-output upgrade bonus.
    pub passive_rate: f64,
    /// Additive click bonus; see [`StructureOutputs::click_multiplier`].
    pub click_bonus: f64,
    pub auto_clicks_per_second: f64,
}

impl StructureOutputs {
    pub fn click_multiplier(&self) -> f64 {
        1.0 + self.click_bonus
    }
}

/// `floor(base_cost × cost_scaling^count)`
pub fn structure_cost(def: &StructureDef, count: u32) -> f64 {
    let exponent = i32::try_from(count).unwrap_or(i32::MAX);
    (def.base_cost * def.cost_scaling.powi(exponent)).floor()
}

#[derive(Debug, Clone)]
pub struct StructureOwnership {
    catalog: Catalog,
    counts: BTreeMap<StructureId, u32>,
    /// `StructureOutput` upgrade bonus applied to the passive channel.
    output_bonus: f64,
    outputs: StructureOutputs,
}

impl StructureOwnership {
    pub fn new(catalog: Catalog) -> Self {
        let counts = catalog.structures().iter().map(|def| (def.id, 0)).collect();
        Self {
            catalog,
            counts,
            output_bonus: 0.0,
            outputs: StructureOutputs::default(),
        }
    }

    pub fn count(&self, id: &str) -> u32 {
        self.catalog
            .structure(id)
            .and_then(|def| self.counts.get(&def.id))
            .copied()
            .unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<StructureId, u32> {
        &self.counts
    }

    pub fn outputs(&self) -> StructureOutputs {
        self.outputs
    }

    /// Cost of the next unit. Unknown ids cost `f64::INFINITY`, which no
    /// balance can afford.
    pub fn cost(&self, id: &str) -> f64 {
        let Some(def) = self.catalog.structure(id) else {
            warn!(structure_id = id, "cost requested for unknown structure");
            return f64::INFINITY;
        };
        structure_cost(def, self.counts.get(&def.id).copied().unwrap_or(0))
    }

    /// Buys one unit: debit, increment, recompute. Nothing changes unless
    /// the debit succeeds.
    pub fn purchase(&mut self, id: &str, wallet: &mut impl Wallet) -> PurchaseOutcome {
        let Some(def) = self.catalog.structure(id) else {
            warn!(structure_id = id, "purchase requested for unknown structure");
            return PurchaseOutcome::UnknownId;
        };
        let count = self.counts.get(&def.id).copied().unwrap_or(0);
        let cost = structure_cost(def, count);
        if !wallet.debit(cost) {
            debug!(structure_id = id, cost, "cannot afford structure");
            return PurchaseOutcome::Unaffordable { cost };
        }
        let new_count = count.saturating_add(1);
        self.counts.insert(def.id, new_count);
        self.recompute(wallet);
        debug!(structure_id = id, cost, count = new_count, "structure purchased");
        PurchaseOutcome::Purchased {
            cost,
            level: new_count,
        }
    }

    /// Stores a new structure-output bonus and recomputes.
    pub fn apply_output_bonus(&mut self, bonus: f64, wallet: &mut impl Wallet) {
        self.output_bonus = bonus;
        self.recompute(wallet);
    }

    /// One pass over the catalog; pushes the passive rate into the wallet.
    pub fn recompute(&mut self, wallet: &mut impl Wallet) {
        let mut outputs = StructureOutputs::default();
        for def in self.catalog.structures() {
            let count = self.counts.get(&def.id).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            let output = def.base_output * f64::from(count);
            match def.output_kind {
                OutputKind::PassiveResource => outputs.passive_rate += output,
                OutputKind::ClickMultiplier => outputs.click_bonus += output,
                OutputKind::AutoClick => outputs.auto_clicks_per_second += output,
            }
        }
        outputs.passive_rate *= (1.0 + self.output_bonus).max(0.0);
        wallet.set_derived_rate(outputs.passive_rate);
        self.outputs = outputs;
    }

    /// Replaces every count from a validated snapshot. Callers recompute
    /// afterwards, once the upgrade bonus is known.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        for def in self.catalog.structures() {
            let count = snapshot
                .structures
                .get(def.id.as_str())
                .map_or(0, |record| record.count);
            self.counts.insert(def.id, count);
        }
    }

    pub fn prepare_snapshot(&self, draft: &mut Snapshot) {
        for (id, count) in &self.counts {
            draft
                .structures
                .insert(id.as_str().to_string(), StructureRecord { count: *count });
        }
    }

    pub fn reset(&mut self, wallet: &mut impl Wallet) {
        for count in self.counts.values_mut() {
            *count = 0;
        }
        self.recompute(wallet);
    }
}
