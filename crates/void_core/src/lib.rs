//! Incremental economy simulation core for Void Architect.
//!
//! No IO, no network, no threads. Hosts drive time through
//! [`TickScheduler::advance`] and persist through a [`SnapshotStore`].

mod catalog;
mod clicker;
mod commands;
mod engine;
mod game;
mod ledger;
pub mod snapshot;
mod structures;
mod types;
mod upgrades;

pub use catalog::{validate_catalog, Catalog, STRUCTURES, UPGRADES};
pub use clicker::{ClickCore, CorePhase};
pub use commands::{apply_command, Command, CommandResult};
pub use engine::{sanitize_delta, MemoryStore, SnapshotStore, TickScheduler, MAX_DELTA_SECONDS};
pub use game::{Game, GameView, StructureRow, UpgradeRow};
pub use ledger::{Currency, Ledger, LedgerError, Wallet};
pub use snapshot::{
    FieldProblem, FieldWarning, Snapshot, SnapshotError, StructureRecord, CURRENT_SAVE_VERSION,
};
pub use structures::{structure_cost, StructureOutputs, StructureOwnership};
pub use types::*;
pub use upgrades::{upgrade_cost, UpgradeProgress};

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
