//! Shared test fixtures for void_core and downstream crates.
//!
//! `funded_game()` and `game_with()` build games from snapshots so tests
//! never need to reach into private state. `FailingStore` exercises the
//! save-failure path.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{Catalog, Game, Snapshot, SnapshotStore, StructureRecord, Tuning};

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Standard game with `void_energy` already in the bank.
pub fn funded_game(void_energy: f64) -> Game {
    game_with(void_energy, &[], &[])
}

/// Standard game with the given balance, structure counts and upgrade levels.
pub fn game_with(void_energy: f64, structures: &[(&str, u32)], upgrades: &[(&str, u32)]) -> Game {
    let mut snapshot = Snapshot::initial(&Catalog::STANDARD);
    snapshot.void_energy = void_energy;
    for (id, count) in structures {
        snapshot
            .structures
            .insert((*id).to_string(), StructureRecord { count: *count });
    }
    for (id, level) in upgrades {
        snapshot.upgrades.insert((*id).to_string(), *level);
    }
    Game::from_snapshot(Catalog::STANDARD, Tuning::STANDARD, &snapshot)
}

/// A store whose disk is always full.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub attempts: usize,
}

impl SnapshotStore for FailingStore {
    type Error = String;

    fn persist(&mut self, _text: &str) -> Result<(), String> {
        self.attempts += 1;
        Err("no space left on device".to_string())
    }

    fn load(&self) -> Result<Option<String>, String> {
        Err("save unreadable".to_string())
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
