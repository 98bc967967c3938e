use serde::{Deserialize, Serialize};

use crate::{ClickOutcome, Game, PurchaseOutcome};

/// A player action addressed to a [`Game`]. Hosts parse these from their
/// input surface and apply them between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Click,
    BuyStructure { structure_id: String },
    BuyUpgrade { upgrade_id: String },
    ResetAll,
    ResetForPrestige,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandResult {
    Click(ClickOutcome),
    Purchase(PurchaseOutcome),
    Reset,
}

pub fn apply_command(game: &mut Game, command: &Command) -> CommandResult {
    match command {
        Command::Click => CommandResult::Click(game.handle_manual_click()),
        Command::BuyStructure { structure_id } => {
            CommandResult::Purchase(game.purchase_structure(structure_id))
        }
        Command::BuyUpgrade { upgrade_id } => {
            CommandResult::Purchase(game.purchase_upgrade(upgrade_id))
        }
        Command::ResetAll => {
            game.reset_all();
            CommandResult::Reset
        }
        Command::ResetForPrestige => {
            game.reset_for_prestige();
            CommandResult::Reset
        }
    }
}
