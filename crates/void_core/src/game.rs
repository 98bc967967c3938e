//! The game context: every stateful subsystem of one session, wired together.
//!
//! All mutation goes through the methods here. Cross-subsystem effects
//! (multiplier resync after a purchase, output bonus after an upgrade,
//! derived-rate recompute after a load) are applied before a method returns,
//! so the game is consistent between any two public calls.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::snapshot::{self, FieldWarning, SnapshotError, CURRENT_SAVE_VERSION};
use crate::{
    Catalog, ClickCore, ClickOutcome, CorePhase, Currency, EffectKind, Event, Ledger, LedgerError,
    PurchaseOutcome, Snapshot, StructureOwnership, Tuning, UpgradeProgress,
};

#[derive(Debug, Clone)]
pub struct Game {
    catalog: Catalog,
    tuning: Tuning,
    ledger: Ledger,
    structures: StructureOwnership,
    upgrades: UpgradeProgress,
    clicker: ClickCore,
    last_save_time: Option<u64>,
    events: Vec<Event>,
}

impl Game {
    pub fn new(catalog: Catalog, tuning: Tuning) -> Self {
        Self {
            catalog,
            tuning,
            ledger: Ledger::new(),
            structures: StructureOwnership::new(catalog),
            upgrades: UpgradeProgress::new(catalog),
            clicker: ClickCore::new(tuning),
            last_save_time: None,
            events: Vec::new(),
        }
    }

    /// Fresh game on the standard catalog and tuning.
    pub fn standard() -> Self {
        Self::new(Catalog::STANDARD, Tuning::STANDARD)
    }

    /// Builds a game from an already validated snapshot.
    pub fn from_snapshot(catalog: Catalog, tuning: Tuning, snapshot: &Snapshot) -> Self {
        let mut game = Self::new(catalog, tuning);
        game.apply_snapshot(snapshot);
        game
    }

    // --- Queries -----------------------------------------------------------

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn structures(&self) -> &StructureOwnership {
        &self.structures
    }

    pub fn upgrades(&self) -> &UpgradeProgress {
        &self.upgrades
    }

    pub fn clicker(&self) -> &ClickCore {
        &self.clicker
    }

    pub fn last_save_time(&self) -> Option<u64> {
        self.last_save_time
    }

    // --- Commands ----------------------------------------------------------

    pub fn purchase_structure(&mut self, id: &str) -> PurchaseOutcome {
        let outcome = self.structures.purchase(id, &mut self.ledger);
        if let PurchaseOutcome::Purchased { cost, level } = outcome {
            self.resync_click_multiplier();
            if let Some(def) = self.catalog.structure(id) {
                self.record(Event::StructurePurchased {
                    structure_id: def.id,
                    cost,
                    count: level,
                });
            }
        }
        outcome
    }

    pub fn purchase_upgrade(&mut self, id: &str) -> PurchaseOutcome {
        let outcome = self.upgrades.purchase(id, &mut self.ledger);
        if let PurchaseOutcome::Purchased { cost, level } = outcome {
            self.resync_click_multiplier();
            if let Some(def) = self.catalog.upgrade(id) {
                if def.has_effect(EffectKind::StructureOutput) {
                    self.resync_structure_output();
                }
                self.record(Event::UpgradePurchased {
                    upgrade_id: def.id,
                    cost,
                    level,
                });
            }
        }
        outcome
    }

    pub fn handle_manual_click(&mut self) -> ClickOutcome {
        self.clicker
            .handle_manual_click(&mut self.ledger, &mut self.events)
    }

    pub fn credit_secondary(&mut self, currency: Currency, amount: f64) -> Result<(), LedgerError> {
        self.ledger.credit_secondary(currency, amount)
    }

    pub fn spend_secondary(&mut self, currency: Currency, amount: f64) -> bool {
        self.ledger.spend_secondary(currency, amount)
    }

    /// Startup load. A payload that is not an object resets the game to
    /// defaults and returns the error; field-level problems are repaired.
    pub fn load_from_snapshot(&mut self, raw: &Value) -> Result<Vec<FieldWarning>, SnapshotError> {
        match snapshot::validate(raw, &self.catalog, &self.tuning) {
            Ok(validated) => {
                self.apply_validated(&validated.snapshot, validated.warnings.len());
                Ok(validated.warnings)
            }
            Err(err) => {
                warn!(%err, "save rejected, starting from defaults");
                self.reset_state();
                Err(err)
            }
        }
    }

    /// Import of exported text. Unlike a load, a rejected import leaves the
    /// current game untouched.
    pub fn import_snapshot(&mut self, text: &str) -> Result<Vec<FieldWarning>, SnapshotError> {
        let validated = snapshot::decode(text, &self.catalog, &self.tuning)?;
        self.apply_validated(&validated.snapshot, validated.warnings.len());
        Ok(validated.warnings)
    }

    pub fn export_snapshot(&self) -> Result<String, SnapshotError> {
        snapshot::encode(&self.to_snapshot())
    }

    /// Pure gather of current state into a fresh snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        let mut draft = Snapshot::default();
        self.prepare_snapshot(&mut draft);
        draft
    }

    /// Each subsystem writes its own fields into `draft`.
    pub fn prepare_snapshot(&self, draft: &mut Snapshot) {
        self.ledger.prepare_snapshot(draft);
        self.structures.prepare_snapshot(draft);
        self.upgrades.prepare_snapshot(draft);
        self.clicker.prepare_snapshot(draft);
        draft.last_save_time = self.last_save_time;
        draft.save_version = CURRENT_SAVE_VERSION;
    }

    /// Back to a brand-new game. Calling it twice leaves the same state as once.
    pub fn reset_all(&mut self) {
        self.reset_state();
        info!("game reset");
        self.record(Event::GameReset);
    }

    /// Clears the run: balance, run totals, structures and click state.
    /// Secondary currencies and upgrade levels survive.
    pub fn reset_for_prestige(&mut self) {
        self.ledger.reset_for_prestige();
        self.structures.reset(&mut self.ledger);
        self.clicker.reset();
        self.resync_structure_output();
        self.resync_click_multiplier();
        info!(
            echoes = self.ledger.secondary(Currency::Echoes),
            "prestige reset"
        );
        self.record(Event::PrestigeReset);
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // --- Scheduler hooks ---------------------------------------------------

    pub(crate) fn tick_clicker(&mut self, delta_seconds: f64) {
        let auto_clicks_per_second = self.structures.outputs().auto_clicks_per_second;
        self.clicker.tick(
            delta_seconds,
            auto_clicks_per_second,
            &mut self.ledger,
            &mut self.events,
        );
    }

    pub(crate) fn apply_passive_income(&mut self, delta_seconds: f64) {
        self.ledger.apply_passive_income(delta_seconds);
    }

    pub(crate) fn mark_saved(&mut self, now_ms: u64) {
        self.last_save_time = Some(now_ms);
    }

    pub(crate) fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    // --- Internal ----------------------------------------------------------

    fn apply_validated(&mut self, snapshot: &Snapshot, warnings: usize) {
        self.apply_snapshot(snapshot);
        info!(warnings, "save loaded");
        self.record(Event::SnapshotLoaded { warnings });
    }

    /// Replaces every subsystem wholesale, then rebuilds the derived caches.
    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.ledger.restore(snapshot);
        self.structures.restore(snapshot);
        self.upgrades.restore(snapshot);
        self.clicker.restore(snapshot);
        self.last_save_time = snapshot.last_save_time;
        self.resync_structure_output();
        self.resync_click_multiplier();
    }

    fn reset_state(&mut self) {
        self.ledger.reset_all();
        self.structures.reset(&mut self.ledger);
        self.upgrades.reset();
        self.clicker.reset();
        self.last_save_time = None;
        self.resync_structure_output();
        self.resync_click_multiplier();
    }

    fn resync_structure_output(&mut self) {
        let bonus = self.upgrades.total_bonus(EffectKind::StructureOutput);
        self.structures.apply_output_bonus(bonus, &mut self.ledger);
    }

    fn resync_click_multiplier(&mut self) {
        self.clicker.recalculate_multiplier(
            self.upgrades.total_bonus(EffectKind::ClickPower),
            self.structures.outputs().click_multiplier(),
        );
    }

    // --- View --------------------------------------------------------------

    /// Read-only projection for renderers and HTTP clients.
    pub fn view(&self) -> GameView {
        let balance = self.ledger.void_energy();
        let structures = self
            .catalog
            .structures()
            .iter()
            .map(|def| {
                let cost = self.structures.cost(def.id.as_str());
                StructureRow {
                    id: def.id.as_str(),
                    name: def.name,
                    description: def.description,
                    tier: def.tier,
                    count: self.structures.count(def.id.as_str()),
                    cost,
                    affordable: balance >= cost,
                }
            })
            .collect();
        let upgrades = self
            .catalog
            .upgrades()
            .iter()
            .map(|def| {
                let id = def.id.as_str();
                let is_max_level = self.upgrades.is_max_level(id);
                let cost = (!is_max_level).then(|| self.upgrades.cost_for_next_level(id));
                UpgradeRow {
                    id,
                    name: def.name,
                    description: def.description,
                    level: self.upgrades.level(id),
                    max_level: def.max_level,
                    cost,
                    is_max_level,
                    affordable: cost.is_some_and(|cost| balance >= cost),
                }
            })
            .collect();
        let outputs = self.structures.outputs();
        GameView {
            void_energy: balance,
            echoes: self.ledger.secondary(Currency::Echoes),
            transcendence_points: self.ledger.secondary(Currency::TranscendencePoints),
            lifetime_generated: self.ledger.lifetime_generated(),
            energy_per_second: self.ledger.derived_rate(),
            auto_clicks_per_second: outputs.auto_clicks_per_second,
            click_multiplier: self.clicker.click_multiplier(),
            heat: self.clicker.heat(),
            max_heat: self.tuning.max_click_heat,
            core: self.clicker.phase(),
            efficiency: self.clicker.efficiency(),
            structures,
            upgrades,
            last_save_time: self.last_save_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameView {
    pub void_energy: f64,
    pub echoes: f64,
    pub transcendence_points: f64,
    pub lifetime_generated: f64,
    pub energy_per_second: f64,
    pub auto_clicks_per_second: f64,
    pub click_multiplier: f64,
    pub heat: f64,
    pub max_heat: f64,
    pub core: CorePhase,
    pub efficiency: f64,
    pub structures: Vec<StructureRow>,
    pub upgrades: Vec<UpgradeRow>,
    pub last_save_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureRow {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: u8,
    pub count: u32,
    pub cost: f64,
    pub affordable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeRow {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub level: u32,
    pub max_level: Option<u32>,
    /// `None` once the max level is reached.
    pub cost: Option<f64>,
    pub is_max_level: bool,
    pub affordable: bool,
}
