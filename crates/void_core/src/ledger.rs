//! Economy ledger: void energy balance, secondary currencies, run totals.

use serde::Serialize;
use tracing::warn;

use crate::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid amount {0}: must be a finite, non-negative number")]
    InvalidAmount(f64),
}

/// Currencies that survive a prestige reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Currency {
    Echoes,
    TranscendencePoints,
}

/// The narrow interface purchases and clicks need from the ledger.
pub trait Wallet {
    /// Adds `amount` to the balance and to the lifetime total.
    fn credit(&mut self, amount: f64) -> Result<(), LedgerError>;
    fn can_afford(&self, amount: f64) -> bool;
    /// Atomic: either the full amount is removed and `true` returned, or
    /// nothing changes.
    fn debit(&mut self, amount: f64) -> bool;
    /// Stores the passive rate computed by structure ownership. Negative
    /// rates are clamped to zero.
    fn set_derived_rate(&mut self, rate: f64);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    void_energy: f64,
    echoes: f64,
    transcendence_points: f64,
    /// Void energy generated since the last prestige. Never decreases within a run.
    lifetime_generated: f64,
    /// Energy per second, owned by structure ownership.
    derived_rate: f64,
}

fn valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn void_energy(&self) -> f64 {
        self.void_energy
    }

    pub fn lifetime_generated(&self) -> f64 {
        self.lifetime_generated
    }

    pub fn derived_rate(&self) -> f64 {
        self.derived_rate
    }

    pub fn secondary(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Echoes => self.echoes,
            Currency::TranscendencePoints => self.transcendence_points,
        }
    }

    fn secondary_mut(&mut self, currency: Currency) -> &mut f64 {
        match currency {
            Currency::Echoes => &mut self.echoes,
            Currency::TranscendencePoints => &mut self.transcendence_points,
        }
    }

    pub fn credit_secondary(&mut self, currency: Currency, amount: f64) -> Result<(), LedgerError> {
        if !valid_amount(amount) {
            warn!(?currency, amount, "rejected invalid secondary credit");
            return Err(LedgerError::InvalidAmount(amount));
        }
        *self.secondary_mut(currency) += amount;
        Ok(())
    }

    pub fn spend_secondary(&mut self, currency: Currency, amount: f64) -> bool {
        if amount.is_nan() || amount < 0.0 {
            warn!(?currency, amount, "rejected invalid secondary spend");
            return false;
        }
        let balance = self.secondary_mut(currency);
        if *balance >= amount {
            *balance -= amount;
            true
        } else {
            false
        }
    }

    /// Credits passive income for `delta_seconds` at the current derived rate.
    pub fn apply_passive_income(&mut self, delta_seconds: f64) {
        let gain = self.derived_rate * delta_seconds;
        if gain > 0.0 {
            // rate and delta are both sanitized, so the credit cannot fail
            let _ = self.credit(gain);
        }
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        *self = Self {
            void_energy: snapshot.void_energy.max(0.0),
            echoes: snapshot.echoes.max(0.0),
            transcendence_points: snapshot.transcendence_points.max(0.0),
            lifetime_generated: snapshot.total_void_energy_generated_this_prestige.max(0.0),
            derived_rate: 0.0,
        };
    }

    pub fn prepare_snapshot(&self, draft: &mut Snapshot) {
        draft.void_energy = self.void_energy;
        draft.echoes = self.echoes;
        draft.transcendence_points = self.transcendence_points;
        draft.total_void_energy_generated_this_prestige = self.lifetime_generated;
    }

    /// Keeps secondary currencies; clears the balance and run totals.
    pub fn reset_for_prestige(&mut self) {
        self.void_energy = 0.0;
        self.lifetime_generated = 0.0;
        self.derived_rate = 0.0;
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }
}

impl Wallet for Ledger {
    fn credit(&mut self, amount: f64) -> Result<(), LedgerError> {
        if !valid_amount(amount) {
            warn!(amount, "rejected invalid credit");
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.void_energy += amount;
        self.lifetime_generated += amount;
        Ok(())
    }

    fn can_afford(&self, amount: f64) -> bool {
        self.void_energy >= amount
    }

    fn debit(&mut self, amount: f64) -> bool {
        if amount.is_nan() || amount < 0.0 {
            warn!(amount, "rejected invalid debit");
            return false;
        }
        if self.can_afford(amount) {
            self.void_energy -= amount;
            true
        } else {
            false
        }
    }

    fn set_derived_rate(&mut self, rate: f64) {
        self.derived_rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_increases_balance_and_lifetime() {
        let mut ledger = Ledger::new();
        ledger.credit(12.5).unwrap();
        assert!((ledger.void_energy() - 12.5).abs() < 1e-9);
        assert!((ledger.lifetime_generated() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn negative_credit_is_rejected_without_change() {
        let mut ledger = Ledger::new();
        ledger.credit(3.0).unwrap();
        assert_eq!(ledger.credit(-1.0), Err(LedgerError::InvalidAmount(-1.0)));
        assert!(ledger.credit(f64::NAN).is_err());
        assert!(ledger.credit(f64::INFINITY).is_err());
        assert!((ledger.void_energy() - 3.0).abs() < 1e-9);
        assert!((ledger.lifetime_generated() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn debit_is_all_or_nothing() {
        let mut ledger = Ledger::new();
        ledger.credit(10.0).unwrap();
        assert!(!ledger.debit(10.5));
        assert!((ledger.void_energy() - 10.0).abs() < 1e-9);
        assert!(ledger.debit(10.0));
        assert!(ledger.void_energy().abs() < 1e-9);
        assert!(!ledger.debit(f64::INFINITY));
        assert!(!ledger.debit(-4.0));
        assert!(ledger.void_energy() >= 0.0);
    }

    #[test]
    fn debit_does_not_touch_lifetime_total() {
        let mut ledger = Ledger::new();
        ledger.credit(8.0).unwrap();
        assert!(ledger.debit(5.0));
        assert!((ledger.lifetime_generated() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn derived_rate_clamps_negative_and_non_finite() {
        let mut ledger = Ledger::new();
        ledger.set_derived_rate(-3.0);
        assert!(ledger.derived_rate().abs() < 1e-9);
        ledger.set_derived_rate(f64::NAN);
        assert!(ledger.derived_rate().abs() < 1e-9);
        ledger.set_derived_rate(0.3);
        assert!((ledger.derived_rate() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn passive_income_uses_derived_rate() {
        let mut ledger = Ledger::new();
        ledger.set_derived_rate(0.5);
        ledger.apply_passive_income(4.0);
        assert!((ledger.void_energy() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn secondary_currencies_credit_and_spend() {
        let mut ledger = Ledger::new();
        ledger.credit_secondary(Currency::Echoes, 5.0).unwrap();
        assert!(!ledger.spend_secondary(Currency::Echoes, 6.0));
        assert!(ledger.spend_secondary(Currency::Echoes, 2.0));
        assert!((ledger.secondary(Currency::Echoes) - 3.0).abs() < 1e-9);
        assert!(ledger.credit_secondary(Currency::TranscendencePoints, -1.0).is_err());
        assert!(ledger.secondary(Currency::TranscendencePoints).abs() < 1e-9);
    }

    #[test]
    fn prestige_keeps_secondary_currencies() {
        let mut ledger = Ledger::new();
        ledger.credit(100.0).unwrap();
        ledger.credit_secondary(Currency::Echoes, 7.0).unwrap();
        ledger.set_derived_rate(1.0);
        ledger.reset_for_prestige();
        assert!(ledger.void_energy().abs() < 1e-9);
        assert!(ledger.lifetime_generated().abs() < 1e-9);
        assert!((ledger.secondary(Currency::Echoes) - 7.0).abs() < 1e-9);
    }
}
