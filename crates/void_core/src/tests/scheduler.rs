use super::*;

#[test]
fn passive_income_credits_each_tick() {
    let mut game = game_with(0.0, &[("crystalNode", 5)], &[]);
    let mut scheduler = scheduler();
    scheduler.advance(&mut game, 2.0, NOW_MS);
    assert_close(game.ledger().void_energy(), 1.0);
    assert_close(game.ledger().lifetime_generated(), 1.0);
}

#[test]
fn invalid_deltas_count_as_zero() {
    let mut game = game_with(0.0, &[("crystalNode", 5), ("gravityWell", 1)], &[]);
    for _ in 0..3 {
        game.handle_manual_click();
    }
    let before = game.to_snapshot();
    let mut scheduler = scheduler();
    for delta in [0.0, -4.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        scheduler.advance(&mut game, delta, NOW_MS);
    }
    assert_eq!(game.to_snapshot(), before);
    assert_close(scheduler.seconds_since_last_save(), 0.0);
}

#[test]
fn huge_delta_stays_in_bounds() {
    let mut game = game_with(0.0, &[("crystalNode", 1), ("gravityWell", 1)], &[]);
    for _ in 0..12 {
        game.handle_manual_click();
    }
    let mut scheduler = scheduler().with_autosave_interval(f64::INFINITY);
    // a week away
    let events = scheduler.advance(&mut game, 604_800.0, NOW_MS);
    assert_close(game.clicker().heat(), 0.0);
    assert_close(game.clicker().efficiency(), 1.0);
    assert_eq!(auto_clicks_resolved(&events), 604_800);
    assert!(game.ledger().void_energy().is_finite());
}

#[test]
fn max_finite_delta_keeps_auto_clicks_working() {
    let mut game = game_with(0.0, &[("gravityWell", 2), ("crystalNode", 1)], &[]);
    let mut scheduler = scheduler().with_autosave_interval(f64::INFINITY);

    let events = scheduler.advance(&mut game, f64::MAX, NOW_MS);
    assert_eq!(auto_clicks_resolved(&events), 2_000_000_000);
    assert!(game.clicker().auto_click_progress().is_finite());
    assert!(game.ledger().void_energy().is_finite());
    assert!(game.ledger().void_energy() > 0.0);

    let events = scheduler.advance(&mut game, 1.0, NOW_MS);
    assert_eq!(auto_clicks_resolved(&events), 2);
    assert!(game.clicker().auto_click_progress() < 1.0);
}

#[test]
fn draft_captures_state_after_auto_clicks() {
    let mut game = game_with(0.0, &[("gravityWell", 3)], &[]);
    let mut scheduler = scheduler();
    scheduler.advance(&mut game, 1.0, NOW_MS);
    assert_close(scheduler.draft().void_energy, 3.0);
    assert_eq!(scheduler.draft().structures["gravityWell"].count, 3);
}

#[test]
fn advance_returns_events_from_commands_in_order() {
    let mut game = funded_game(21.0);
    let mut scheduler = scheduler();
    game.purchase_structure("crystalNode");
    game.purchase_structure("crystalNode");
    let events = scheduler.advance(&mut game, 0.1, NOW_MS);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[1],
        Event::StructurePurchased { count: 2, .. }
    ));
    assert!(scheduler.advance(&mut game, 0.1, NOW_MS).is_empty());
}

#[test]
fn autosave_fires_after_interval() {
    let mut game = game_with(0.0, &[("crystalNode", 1)], &[]);
    let mut scheduler = scheduler();
    for _ in 0..29 {
        scheduler.advance(&mut game, 1.0, NOW_MS);
    }
    assert_eq!(scheduler.store().writes(), 0);

    let events = scheduler.advance(&mut game, 1.0, NOW_MS + 30_000);
    assert_eq!(scheduler.store().writes(), 1);
    assert!(events.contains(&Event::Saved {
        last_save_time: Some(NOW_MS + 30_000)
    }));
    assert_eq!(game.last_save_time(), Some(NOW_MS + 30_000));
    assert_close(scheduler.seconds_since_last_save(), 0.0);

    let saved = scheduler.store().saved().unwrap();
    let mut restored = Game::standard();
    restored.import_snapshot(saved).unwrap();
    assert_eq!(restored.structures().count("crystalNode"), 1);
    assert_eq!(restored.last_save_time(), Some(NOW_MS + 30_000));
}

#[test]
fn save_failure_is_reported_and_simulation_continues() {
    let mut game = game_with(0.0, &[("crystalNode", 10)], &[]);
    let mut scheduler = TickScheduler::new(FailingStore::default(), &Tuning::STANDARD)
        .with_autosave_interval(1.0);

    let events = scheduler.advance(&mut game, 1.0, NOW_MS);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::SaveFailed { reason } if reason.contains("no space"))));
    assert_eq!(game.last_save_time(), None);

    scheduler.advance(&mut game, 1.0, NOW_MS);
    assert_close(game.ledger().void_energy(), 2.0);
    assert_eq!(scheduler.store().attempts, 2);
}

#[test]
fn restore_into_loads_stored_save() {
    let source = game_with(42.0, &[("fluxShard", 2)], &[]);
    let text = source.export_snapshot().unwrap();
    let mut scheduler = TickScheduler::new(MemoryStore::with_text(text), &Tuning::STANDARD);

    let mut game = Game::standard();
    assert!(scheduler.restore_into(&mut game));
    assert_close(game.ledger().void_energy(), 42.0);
    assert_close(game.clicker().click_multiplier(), 1.04);
    assert_eq!(scheduler.draft().structures["fluxShard"].count, 2);
}

#[test]
fn restore_into_tolerates_missing_and_broken_saves() {
    let mut game = Game::standard();

    let mut empty = scheduler();
    assert!(!empty.restore_into(&mut game));

    let mut unreadable = TickScheduler::new(FailingStore::default(), &Tuning::STANDARD);
    assert!(!unreadable.restore_into(&mut game));

    let mut garbage = TickScheduler::new(MemoryStore::with_text("{{{"), &Tuning::STANDARD);
    assert!(!garbage.restore_into(&mut game));
    assert_eq!(game.to_snapshot(), Snapshot::initial(&Catalog::STANDARD));
}

#[test]
fn explicit_save_resets_autosave_timer() {
    let mut game = Game::standard();
    let mut scheduler = scheduler();
    scheduler.advance(&mut game, 20.0, NOW_MS);
    assert!(scheduler.save_now(&mut game, NOW_MS));
    scheduler.advance(&mut game, 20.0, NOW_MS);
    assert_eq!(scheduler.store().writes(), 1);
}

#[test]
fn sanitize_delta_caps_finite_deltas() {
    assert_close(sanitize_delta(0.5), 0.5);
    assert_close(sanitize_delta(f64::MAX), MAX_DELTA_SECONDS);
    assert_close(sanitize_delta(f64::NAN), 0.0);
}
