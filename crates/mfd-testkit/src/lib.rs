//! mfd-testkit
//!
//! In-memory backing store for the settlement traits plus seed fixtures.
//! - Transactions work on a private copy and publish it on commit
//! - One transaction at a time (the store mutex is held for its lifetime)
//! - One-shot fault injection at any storage step
//! No IO; used by the scenario tests and the daemon's router tests.

mod fixtures;
mod memory;

pub use fixtures::{cash, card, guest, usd, DeskFixture, TEST_RATE};
pub use memory::{FaultPoint, MemoryState, MemoryStore, MemoryTx};
