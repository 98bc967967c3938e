//! Integration test: click → buy → idle → autosave → reload → prestige.

use void_core::test_fixtures::{assert_close, funded_game};
use void_core::*;

const FRAME: f64 = 1.0 / 60.0;

#[test]
fn full_session_lifecycle() {
    let mut game = Game::standard();
    let mut scheduler = TickScheduler::new(MemoryStore::new(), &Tuning::STANDARD);
    let mut now_ms = 1_700_000_000_000_u64;
    let mut events = Vec::new();

    // Click in bursts, letting the core cool between them, until the first
    // node is affordable.
    while game.ledger().void_energy() < 10.0 {
        for _ in 0..10 {
            game.handle_manual_click();
        }
        for _ in 0..60 {
            now_ms += 16;
            events.extend(scheduler.advance(&mut game, FRAME, now_ms));
        }
    }
    assert!(!game.clicker().is_overheated());
    assert!(game.purchase_structure("crystalNode").is_purchased());

    // Idle for two minutes of frames; passive income accrues and autosave runs.
    for _ in 0..(120 * 60) {
        now_ms += 16;
        events.extend(scheduler.advance(&mut game, FRAME, now_ms));
    }
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::StructurePurchased { .. })));
    let saves = events
        .iter()
        .filter(|event| matches!(event, Event::Saved { .. }))
        .count();
    assert_eq!(saves, 4);
    assert_eq!(scheduler.store().writes(), 4);

    // Reload the last autosave into a new session.
    let mut reloaded = Game::standard();
    let mut second = TickScheduler::new(scheduler.store().clone(), &Tuning::STANDARD);
    assert!(second.restore_into(&mut reloaded));
    assert_eq!(reloaded.structures().count("crystalNode"), 1);
    assert_close(reloaded.ledger().derived_rate(), 0.1);
    assert_eq!(reloaded.last_save_time(), game.last_save_time());

    // Prestige clears the run but keeps echoes.
    reloaded
        .credit_secondary(Currency::Echoes, 1.0)
        .unwrap();
    reloaded.reset_for_prestige();
    assert_eq!(reloaded.structures().count("crystalNode"), 0);
    assert_close(reloaded.ledger().secondary(Currency::Echoes), 1.0);
}

#[test]
fn buying_every_structure_from_a_large_bank() {
    let mut game = funded_game(1_000_000.0);
    for def in Catalog::STANDARD.structures() {
        for _ in 0..10 {
            assert!(game.purchase_structure(def.id.as_str()).is_purchased());
        }
    }
    let view = game.view();
    assert!(view.structures.iter().all(|row| row.count == 10));
    assert_close(view.energy_per_second, 1.0);
    assert_close(view.click_multiplier, 1.2);
    assert_close(view.auto_clicks_per_second, 10.0);
}
