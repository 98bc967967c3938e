use serde::{Deserialize, Serialize};
use void_core::{sanitize_delta, Command, Game};

pub trait CommandSource {
    fn generate_commands(&mut self, game: &Game, delta_seconds: f64) -> Vec<Command>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPlayerConfig {
    pub clicks_per_second: f64,
    /// Buy the cheapest affordable structure or upgrade each tick.
    pub buy_cheapest: bool,
}

impl Default for AutoPlayerConfig {
    fn default() -> Self {
        Self {
            clicks_per_second: 5.0,
            buy_cheapest: true,
        }
    }
}

/// Plays the game unattended:
/// 1. Click at the configured rate, skipping any click that would overheat
///    the core.
/// 2. Buy the cheapest affordable structure or upgrade, at most one per tick.
#[derive(Debug, Clone)]
pub struct AutoPlayer {
    config: AutoPlayerConfig,
    click_progress: f64,
}

impl AutoPlayer {
    pub fn new(config: AutoPlayerConfig) -> Self {
        Self {
            config,
            click_progress: 0.0,
        }
    }

    pub fn config(&self) -> &AutoPlayerConfig {
        &self.config
    }
}

impl Default for AutoPlayer {
    fn default() -> Self {
        Self::new(AutoPlayerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Clicks that still leave heat strictly below the maximum.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn safe_click_count(game: &Game) -> u32 {
    let tuning = game.tuning();
    let headroom = tuning.max_click_heat - game.clicker().heat();
    let clicks = (headroom / tuning.heat_per_click).ceil() - 1.0;
    if clicks > 0.0 {
        clicks.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// The lowest-cost purchase the current balance covers, structures first on ties.
fn cheapest_purchase(game: &Game) -> Option<Command> {
    let view = game.view();
    let structures = view
        .structures
        .iter()
        .filter(|row| row.affordable)
        .map(|row| {
            (
                row.cost,
                Command::BuyStructure {
                    structure_id: row.id.to_string(),
                },
            )
        });
    let upgrades = view.upgrades.iter().filter(|row| row.affordable).filter_map(|row| {
        row.cost.map(|cost| {
            (
                cost,
                Command::BuyUpgrade {
                    upgrade_id: row.id.to_string(),
                },
            )
        })
    });
    structures
        .chain(upgrades)
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, command)| command)
}

impl CommandSource for AutoPlayer {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn generate_commands(&mut self, game: &Game, delta_seconds: f64) -> Vec<Command> {
        let mut commands = Vec::new();

        if game.clicker().is_overheated() {
            self.click_progress = 0.0;
        } else {
            self.click_progress +=
                self.config.clicks_per_second.max(0.0) * sanitize_delta(delta_seconds);
            let wanted = self.click_progress.floor();
            self.click_progress -= wanted;
            let clicks = (wanted.min(f64::from(u32::MAX)) as u32).min(safe_click_count(game));
            commands.extend((0..clicks).map(|_| Command::Click));
        }

        if self.config.buy_cheapest {
            commands.extend(cheapest_purchase(game));
        }
        commands
    }
}
