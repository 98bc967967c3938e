//! Progression regression tests.
//!
//! These run the full tick loop with the autoplayer at 60 frames per second
//! and check that early milestones are reached without ever overheating.

use void_control::{AutoPlayer, AutoPlayerConfig, CommandSource};
use void_core::test_fixtures::{funded_game, game_with};
use void_core::*;

const FRAME: f64 = 1.0 / 60.0;

fn play(game: &mut Game, player: &mut AutoPlayer, seconds: u32) -> Vec<Event> {
    let mut scheduler = TickScheduler::new(MemoryStore::new(), game.tuning());
    let mut events = Vec::new();
    for frame in 0..(seconds * 60) {
        for command in player.generate_commands(game, FRAME) {
            apply_command(game, &command);
        }
        events.extend(scheduler.advance(game, FRAME, u64::from(frame) * 16));
    }
    events
}

#[test]
fn ten_minutes_of_autoplay_reaches_early_milestones() {
    let mut game = Game::standard();
    let mut player = AutoPlayer::default();
    let events = play(&mut game, &mut player, 600);

    assert!(
        !events.iter().any(|e| matches!(e, Event::CoreOverheated { .. })),
        "autoplayer overheated the core"
    );
    assert!(game.structures().count("crystalNode") >= 5);
    assert!(game.upgrades().level("clickPower_1") >= 1);
    assert!(game.ledger().derived_rate() > 0.0);
}

#[test]
fn clicks_follow_configured_rate() {
    let game = Game::standard();
    let mut player = AutoPlayer::new(AutoPlayerConfig {
        clicks_per_second: 2.0,
        buy_cheapest: false,
    });
    let mut clicks = 0;
    for _ in 0..4 {
        clicks += player
            .generate_commands(&game, 0.25)
            .iter()
            .filter(|command| **command == Command::Click)
            .count();
    }
    assert_eq!(clicks, 2);
    assert!(player.generate_commands(&game, f64::NAN).is_empty());
}

#[test]
fn clicking_stops_short_of_overheat() {
    let mut game = funded_game(0.0);
    for _ in 0..18 {
        game.handle_manual_click();
    }
    // heat 90: one more click is safe, the second would overheat
    let mut player = AutoPlayer::new(AutoPlayerConfig {
        clicks_per_second: 100.0,
        buy_cheapest: false,
    });
    let commands = player.generate_commands(&game, 1.0);
    assert_eq!(commands, vec![Command::Click]);
}

#[test]
fn overheated_core_gets_no_clicks() {
    let mut game = funded_game(0.0);
    for _ in 0..20 {
        game.handle_manual_click();
    }
    assert!(game.clicker().is_overheated());
    let mut player = AutoPlayer::new(AutoPlayerConfig {
        clicks_per_second: 5.0,
        buy_cheapest: false,
    });
    assert!(player.generate_commands(&game, 1.0).is_empty());
}

#[test]
fn buys_cheapest_affordable_option() {
    let game = funded_game(60.0);
    let mut player = AutoPlayer::new(AutoPlayerConfig {
        clicks_per_second: 0.0,
        buy_cheapest: true,
    });
    assert_eq!(
        player.generate_commands(&game, FRAME),
        vec![Command::BuyStructure {
            structure_id: "crystalNode".to_string()
        }]
    );

    // nodes now cost more than the click upgrade
    let game = game_with(30.0, &[("crystalNode", 20)], &[]);
    assert_eq!(
        player.generate_commands(&game, FRAME),
        vec![Command::BuyUpgrade {
            upgrade_id: "clickPower_1".to_string()
        }]
    );

    let broke = funded_game(5.0);
    assert!(player.generate_commands(&broke, FRAME).is_empty());
}

#[test]
fn config_fills_missing_fields_from_defaults() {
    let config: AutoPlayerConfig = serde_json::from_str(r#"{ "buy_cheapest": false }"#).unwrap();
    assert!(!config.buy_cheapest);
    assert!((config.clicks_per_second - 5.0).abs() < 1e-9);
}
