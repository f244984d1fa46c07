//! Food ledger: persistence boundary for confirmed entries.

pub mod food_ledger;
pub mod sqlite_ledger;

pub use food_ledger::{FoodLedger, InMemoryFoodLedger, LedgerFuture};
pub use sqlite_ledger::SqliteFoodLedger;
