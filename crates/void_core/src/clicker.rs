//! Click interaction state machine: heat, overheat cooldown, efficiency and
//! fractional auto-click accrual.
//!
//! Manual clicks pay heat and efficiency; auto-clicks bypass both. While
//! the core is overheated nothing else advances: heat stays pinned at max,
//! efficiency does not recover and auto-clicks do not accrue.

use serde::Serialize;
use tracing::{debug, info};

use crate::{ClickOutcome, Event, Snapshot, Tuning, Wallet};

/// Most auto-clicks one tick can accrue. Keeps the accumulator finite.
const MAX_AUTO_CLICKS_PER_TICK: f64 = 4_294_967_295.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CorePhase {
    Active,
    Overheated { remaining_seconds: f64 },
}

#[derive(Debug, Clone)]
pub struct ClickCore {
    tuning: Tuning,
    heat: f64,
    phase: CorePhase,
    efficiency: f64,
    since_last_manual_click: f64,
    auto_click_progress: f64,
    /// Cached `max(0, 1 + upgrade bonus) × structure multiplier`.
    multiplier: f64,
}

impl ClickCore {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            heat: 0.0,
            phase: CorePhase::Active,
            efficiency: 1.0,
            since_last_manual_click: 0.0,
            auto_click_progress: 0.0,
            multiplier: 1.0,
        }
    }

    pub fn heat(&self) -> f64 {
        self.heat
    }

    pub fn phase(&self) -> CorePhase {
        self.phase
    }

    pub fn is_overheated(&self) -> bool {
        matches!(self.phase, CorePhase::Overheated { .. })
    }

    /// Seconds left on the cooldown; zero while active.
    pub fn overheat_remaining(&self) -> f64 {
        match self.phase {
            CorePhase::Overheated { remaining_seconds } => remaining_seconds,
            CorePhase::Active => 0.0,
        }
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn since_last_manual_click(&self) -> f64 {
        self.since_last_manual_click
    }

    pub fn auto_click_progress(&self) -> f64 {
        self.auto_click_progress
    }

    pub fn click_multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn recalculate_multiplier(&mut self, upgrade_bonus: f64, structure_multiplier: f64) {
        self.multiplier = (1.0 + upgrade_bonus).max(0.0) * structure_multiplier;
    }

    pub fn handle_manual_click(
        &mut self,
        wallet: &mut impl Wallet,
        events: &mut Vec<Event>,
    ) -> ClickOutcome {
        if self.is_overheated() {
            debug!("click ignored: core overheated");
            return ClickOutcome::Rejected;
        }
        let t = self.tuning;
        let energy = t.base_click_energy * self.multiplier * self.efficiency;
        let _ = wallet.credit(energy);

        self.heat += t.heat_per_click;
        self.efficiency =
            (self.efficiency - t.click_efficiency_decay_rate).max(t.min_click_efficiency);
        self.since_last_manual_click = 0.0;

        let overheated = self.heat >= t.max_click_heat;
        if overheated {
            self.enter_overheat(events);
        }
        ClickOutcome::Accepted { energy, overheated }
    }

    /// Advances the machine by a sanitized, non-negative delta.
    pub fn tick(
        &mut self,
        delta_seconds: f64,
        auto_clicks_per_second: f64,
        wallet: &mut impl Wallet,
        events: &mut Vec<Event>,
    ) {
        if let CorePhase::Overheated { remaining_seconds } = self.phase {
            let remaining_seconds = remaining_seconds - delta_seconds;
            if remaining_seconds <= 0.0 {
                self.exit_overheat(events);
            } else {
                self.phase = CorePhase::Overheated { remaining_seconds };
            }
            return;
        }

        let t = self.tuning;
        if self.heat > 0.0 {
            self.heat = (self.heat - t.heat_decay_rate * delta_seconds).max(0.0);
        }

        self.since_last_manual_click += delta_seconds;
        if self.since_last_manual_click > t.efficiency_recovery_delay_seconds
            && self.efficiency < 1.0
        {
            self.efficiency =
                (self.efficiency + t.click_efficiency_recovery_rate * delta_seconds).min(1.0);
        }

        if auto_clicks_per_second > 0.0 {
            let accrual = (auto_clicks_per_second * delta_seconds).min(MAX_AUTO_CLICKS_PER_TICK);
            self.auto_click_progress += accrual;
            if !self.auto_click_progress.is_finite() {
                self.auto_click_progress = 0.0;
            }
            let whole = self.auto_click_progress.floor();
            if whole >= 1.0 {
                self.auto_click_progress -= whole;
                self.resolve_auto_clicks(whole, wallet, events);
            }
        }
    }

    /// One batched credit for `clicks` auto-clicks. Heat and efficiency are untouched.
    fn resolve_auto_clicks(&self, clicks: f64, wallet: &mut impl Wallet, events: &mut Vec<Event>) {
        let energy = self.tuning.base_click_energy * self.multiplier * clicks;
        let _ = wallet.credit(energy);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let clicks = clicks as u64;
        events.push(Event::AutoClicksResolved { clicks, energy });
    }

    fn enter_overheat(&mut self, events: &mut Vec<Event>) {
        let cooldown = self.tuning.overheat_cooldown_seconds;
        info!(cooldown, "core overheated");
        self.heat = self.tuning.max_click_heat;
        self.phase = CorePhase::Overheated {
            remaining_seconds: cooldown,
        };
        events.push(Event::CoreOverheated {
            cooldown_seconds: cooldown,
        });
    }

    fn exit_overheat(&mut self, events: &mut Vec<Event>) {
        info!("core cooled down");
        self.phase = CorePhase::Active;
        self.heat = 0.0;
        self.since_last_manual_click = 0.0;
        events.push(Event::CoreCooled);
    }

    /// Loads heat, overheat flag and efficiency. An overheated core restarts
    /// its full cooldown since the remaining time is not persisted.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        let t = self.tuning;
        self.efficiency = snapshot
            .click_efficiency
            .clamp(t.min_click_efficiency.min(1.0), 1.0);
        self.since_last_manual_click = 0.0;
        self.auto_click_progress = 0.0;
        if snapshot.is_core_overheated {
            self.heat = t.max_click_heat;
            self.phase = CorePhase::Overheated {
                remaining_seconds: t.overheat_cooldown_seconds,
            };
        } else {
            self.heat = snapshot.click_heat.clamp(0.0, t.max_click_heat);
            self.phase = CorePhase::Active;
        }
    }

    pub fn prepare_snapshot(&self, draft: &mut Snapshot) {
        draft.click_heat = self.heat;
        draft.is_core_overheated = self.is_overheated();
        draft.click_efficiency = self.efficiency;
    }

    /// Back to a cold, fully efficient core. The cached multiplier is kept;
    /// the owner recalculates it after resetting its sources.
    pub fn reset(&mut self) {
        *self = Self {
            multiplier: self.multiplier,
            ..Self::new(self.tuning)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ledger;

    fn core() -> ClickCore {
        ClickCore::new(Tuning::STANDARD)
    }

    #[test]
    fn manual_click_credits_and_heats() {
        let mut core = core();
        let mut ledger = Ledger::new();
        let mut events = Vec::new();
        let outcome = core.handle_manual_click(&mut ledger, &mut events);
        assert!(matches!(outcome, ClickOutcome::Accepted { overheated: false, .. }));
        assert!((ledger.void_energy() - 1.0).abs() < 1e-9);
        assert!((core.heat() - 5.0).abs() < 1e-9);
        assert!((core.efficiency() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn efficiency_modulates_manual_energy() {
        let mut core = core();
        let mut ledger = Ledger::new();
        let mut events = Vec::new();
        core.handle_manual_click(&mut ledger, &mut events);
        core.handle_manual_click(&mut ledger, &mut events);
        // 1.0 at full efficiency, then 0.95
        assert!((ledger.void_energy() - 1.95).abs() < 1e-9);
    }

    #[test]
    fn efficiency_never_drops_below_minimum() {
        let mut core = core();
        let mut ledger = Ledger::new();
        let mut events = Vec::new();
        for _ in 0..19 {
            core.handle_manual_click(&mut ledger, &mut events);
        }
        assert!(!core.is_overheated());
        assert!((core.efficiency() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn multiplier_combines_upgrade_and_structure_sources() {
        let mut core = core();
        core.recalculate_multiplier(0.5, 1.1);
        assert!((core.click_multiplier() - 1.65).abs() < 1e-9);
        core.recalculate_multiplier(-3.0, 1.1);
        assert!(core.click_multiplier().abs() < 1e-9);
    }

    #[test]
    fn heat_decays_while_active() {
        let mut core = core();
        let mut ledger = Ledger::new();
        let mut events = Vec::new();
        for _ in 0..4 {
            core.handle_manual_click(&mut ledger, &mut events);
        }
        core.tick(1.0, 0.0, &mut ledger, &mut events);
        assert!((core.heat() - 5.0).abs() < 1e-9);
        core.tick(10.0, 0.0, &mut ledger, &mut events);
        assert!(core.heat().abs() < 1e-9);
    }

    #[test]
    fn efficiency_waits_for_idle_delay_before_recovering() {
        let mut core = core();
        let mut ledger = Ledger::new();
        let mut events = Vec::new();
        core.handle_manual_click(&mut ledger, &mut events);
        core.tick(0.05, 0.0, &mut ledger, &mut events);
        assert!((core.efficiency() - 0.95).abs() < 1e-9);
        core.tick(0.1, 0.0, &mut ledger, &mut events);
        assert!((core.efficiency() - 0.975).abs() < 1e-9);
        core.tick(100.0, 0.0, &mut ledger, &mut events);
        assert!((core.efficiency() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_delta_caps_auto_click_accrual() {
        let mut core = core();
        let mut ledger = Ledger::new();
        let mut events = Vec::new();
        core.tick(f64::MAX, 2.0, &mut ledger, &mut events);
        assert!(core.auto_click_progress().is_finite());
        assert!((0.0..1.0).contains(&core.auto_click_progress()));
        assert!(matches!(
            events.last(),
            Some(Event::AutoClicksResolved { clicks: 4_294_967_295, .. })
        ));

        events.clear();
        core.tick(1.0, 2.0, &mut ledger, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::AutoClicksResolved { clicks: 2, .. }]
        ));
    }

    #[test]
    fn restore_of_overheated_save_restarts_cooldown() {
        let mut core = core();
        let snapshot = Snapshot {
            is_core_overheated: true,
            click_heat: 40.0,
            ..Snapshot::default()
        };
        core.restore(&snapshot);
        assert!(core.is_overheated());
        assert!((core.heat() - 100.0).abs() < 1e-9);
        assert!((core.overheat_remaining() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn restore_clamps_out_of_range_values() {
        let mut core = core();
        let snapshot = Snapshot {
            click_heat: 250.0,
            click_efficiency: 0.01,
            ..Snapshot::default()
        };
        core.restore(&snapshot);
        assert!((core.heat() - 100.0).abs() < 1e-9);
        assert!((core.efficiency() - 0.25).abs() < 1e-9);
        assert!(!core.is_overheated());
    }
}
