use super::*;
use crate::test_fixtures::{assert_close, funded_game, game_with, make_rng, FailingStore};

mod scheduler;

// --- Shared test helpers ------------------------------------------------

const NOW_MS: u64 = 1_700_000_000_000;

fn scheduler() -> TickScheduler<MemoryStore> {
    TickScheduler::new(MemoryStore::new(), &Tuning::STANDARD)
}

/// Standard game restored from `snapshot`, starting from the initial state.
fn game_from(edit: impl FnOnce(&mut Snapshot)) -> Game {
    let mut snapshot = Snapshot::initial(&Catalog::STANDARD);
    edit(&mut snapshot);
    Game::from_snapshot(Catalog::STANDARD, Tuning::STANDARD, &snapshot)
}

fn overheated_game() -> Game {
    game_from(|snapshot| snapshot.is_core_overheated = true)
}

fn auto_clicks_resolved(events: &[Event]) -> u64 {
    events
        .iter()
        .filter_map(|event| match event {
            Event::AutoClicksResolved { clicks, .. } => Some(*clicks),
            _ => None,
        })
        .sum()
}
